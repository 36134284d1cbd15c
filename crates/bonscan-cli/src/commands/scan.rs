//! Scan and re-extraction commands

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bonscan_core::{
    ChainConfig, Database, Error, ProviderChain, ScanPipeline, ScanReport,
};

/// Build the provider chain from configuration, unless AI was disabled
pub fn build_chain(no_ai: bool) -> Result<Option<ProviderChain>> {
    if no_ai {
        return Ok(None);
    }
    let config = ChainConfig::load().context("Failed to load provider config")?;
    let chain = ProviderChain::from_config(&config).context("Failed to build provider chain")?;
    if chain.is_empty() {
        return Ok(None);
    }
    Ok(Some(chain))
}

pub async fn cmd_scan(
    db: &Database,
    file: &Path,
    store: Option<&str>,
    no_ai: bool,
) -> Result<()> {
    let ocr_text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read OCR text from {}", file.display()))?;

    println!("🧾 Scanning {}...", file.display());

    let chain = build_chain(no_ai)?;
    let pipeline = ScanPipeline::new(db, chain.as_ref());

    let report = match pipeline.scan(&ocr_text, store).await {
        Ok(report) => report,
        Err(Error::Validation(msg)) => {
            // Actionable, distinct from generic failures; nothing was stored.
            bail!(
                "No items could be read from this receipt ({}).\n\
                 Check that the OCR text is complete, or rescan the photo.",
                msg
            );
        }
        Err(Error::Duplicate(msg)) => {
            bail!("This receipt was already scanned ({}).", msg);
        }
        Err(e) => return Err(e.into()),
    };

    print_report(&report);
    Ok(())
}

pub async fn cmd_reextract(db: &Database, receipt_id: i64) -> Result<()> {
    let chain = build_chain(false)?
        .context("No providers configured; add some to providers.toml")?;
    let pipeline = ScanPipeline::new(db, Some(&chain));

    println!("🤖 Re-running extraction for receipt {}...", receipt_id);

    match pipeline.reextract(receipt_id).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(Error::AttemptsExhausted { attempts, max, .. }) => {
            bail!(
                "Giving up: all {} of {} extraction attempts for this receipt are used.",
                attempts,
                max
            );
        }
        Err(Error::ProviderChain(failures)) => {
            // One consolidated message instead of one per provider.
            let detail: Vec<String> = failures
                .iter()
                .map(|f| format!("{}: {}", f.provider, f.message))
                .collect();
            bail!(
                "Extraction failed; every provider errored ({}).",
                detail.join("; ")
            );
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &ScanReport) {
    let receipt = &report.receipt;

    println!();
    println!("🏪 {}", receipt.store_name);
    if let Some(ref address) = receipt.store_address {
        println!("   {}", address);
    }
    if let Some(date) = receipt.purchase_date {
        println!("   {}", date);
    }

    println!();
    for item in &receipt.items {
        let qty = match (item.quantity, item.unit_price) {
            (Some(q), Some(u)) => format!(" ({} x {:.2})", q, u),
            (Some(q), None) => format!(" (x{})", q),
            _ => String::new(),
        };
        let marker = match item.source {
            bonscan_core::ItemSource::Ai => " 🤖",
            bonscan_core::ItemSource::Parser => "",
        };
        println!(
            "   {:<30} {:>7.2}  {}{}{}",
            super::truncate(&item.name, 30),
            item.total_price,
            item.category,
            qty,
            marker
        );
    }

    println!("   {:─<52}", "");
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
            "⚠️  Item sum {:.2} does not match the receipt total {:.2}.",
            receipt.item_sum(),
            receipt.total_amount
        );
        println!("   Run 'bonscan reextract {}' to try the AI chain again.", report.receipt_id);
    }

    if !report.ai_failures.is_empty() {
        let names: Vec<&str> = report
            .ai_failures
            .iter()
            .map(|f| f.provider.as_str())
            .collect();
        println!();
        println!("   (providers that failed along the way: {})", names.join(", "));
    }

    if report.needs_store_name {
        println!();
        println!(
            "❓ Store not recognized. Set it with: bonscan receipts set-store {} \"<name>\"",
            report.receipt_id
        );
    }

    println!();
    println!("✅ Stored as receipt {}", report.receipt_id);
}
