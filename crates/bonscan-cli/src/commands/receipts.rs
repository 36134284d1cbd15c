//! Receipt commands

use anyhow::{bail, Result};
use bonscan_core::Database;

pub fn cmd_receipts_list(db: &Database, limit: i64) -> Result<()> {
    let receipts = db.list_receipts(limit)?;

    if receipts.is_empty() {
        println!("No receipts yet. Scan one with: bonscan scan --file receipt.txt");
        return Ok(());
    }

    println!(
        "{:>5}  {:<10} {:<28} {:<12} {:>9}  {}",
        "ID", "Vendor", "Store", "Date", "Total", "Flags"
    );
    for receipt in receipts {
        let date = receipt
            .purchase_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut flags = Vec::new();
        if receipt.discrepancy_detected {
            flags.push("⚠ discrepancy");
        }
        if receipt.ai_attempts > 0 {
            flags.push("🤖");
        }
        println!(
            "{:>5}  {:<10} {:<28} {:<12} {:>9.2}  {}",
            receipt.id,
            receipt.vendor.as_str(),
            super::truncate(&receipt.store_name, 28),
            date,
            receipt.total_amount,
            flags.join(" ")
        );
    }

    Ok(())
}

pub fn cmd_receipts_show(db: &Database, receipt_id: i64) -> Result<()> {
    let Some(receipt) = db.get_receipt(receipt_id)? else {
        bail!("Receipt {} not found", receipt_id);
    };
    let items = db.get_items(receipt_id)?;

    println!("🏪 {} ({})", receipt.store_name, receipt.vendor);
    if let Some(ref address) = receipt.store_address {
        println!("   {}", address);
    }
    if let Some(date) = receipt.purchase_date {
        println!("   {}", date);
    }
    println!();

    for record in &items {
        let item = &record.item;
        println!(
            "   {:<30} {:>7.2}  {}",
            super::truncate(&item.name, 30),
            item.total_price,
            item.category
        );
    }

    println!("   {:─<48}", "");
    println!(
        "   {:<30} {:>7.2}  ({})",
        "Total",
        receipt.total_amount,
        receipt.total_method.as_str()
    );
    for tax in &receipt.tax_details {
        println!(
            "   VAT {}: net {:.2}  tax {:.2}  gross {:.2}",
            tax.class, tax.net, tax.tax, tax.gross
        );
    }
    if receipt.discrepancy_detected {
        println!();
        println!(
            "⚠️  Discrepancy flagged ({} of 3 AI attempts used)",
            receipt.ai_attempts
        );
    }

    Ok(())
}

pub fn cmd_receipts_delete(db: &Database, receipt_id: i64) -> Result<()> {
    if db.delete_receipt(receipt_id)? {
        println!("🗑️  Deleted receipt {}", receipt_id);
        Ok(())
    } else {
        bail!("Receipt {} not found", receipt_id);
    }
}

pub fn cmd_receipts_set_store(db: &Database, receipt_id: i64, name: &str) -> Result<()> {
    db.update_store_name(receipt_id, name)?;
    println!("✅ Receipt {} is now attributed to \"{}\"", receipt_id, name);
    Ok(())
}
