//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database status and category statistics

use std::path::Path;

use anyhow::{Context, Result};
use bonscan_core::db::Database;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_string_lossy();
    if no_encrypt {
        Database::new_unencrypted(&path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(&path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let seeded = db
        .seed_default_mappings()
        .context("Failed to seed category mappings")?;
    if seeded > 0 {
        println!("   Seeded {} category mappings", seeded);
    } else {
        println!("   Category mappings already present");
    }

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Scan a receipt: bonscan scan --file receipt.txt");
    println!("  2. Check the result: bonscan receipts");

    Ok(())
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    let receipts = db.list_receipts(i64::MAX)?;
    let discrepancies = receipts.iter().filter(|r| r.discrepancy_detected).count();
    let mappings = db.mapping_count()?;
    let encrypted = db.is_encrypted().unwrap_or(false);

    println!("📊 Bonscan Status");
    println!("   ─────────────────────────────");
    println!("   Database: {}", db.path());
    println!(
        "   Encryption: {}",
        if encrypted { "enabled" } else { "disabled" }
    );
    println!("   Receipts: {}", receipts.len());
    println!("   Open discrepancies: {}", discrepancies);
    println!("   Category mappings: {}", mappings);

    let counts = db.category_counts()?;
    if !counts.is_empty() {
        println!();
        println!("   Items by category:");
        for (category, count) in counts {
            println!("   {:>6}  {}", count, category);
        }
    }

    Ok(())
}
