//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bonscan - Scan and categorize supermarket receipts
#[derive(Parser)]
#[command(name = "bonscan")]
#[command(about = "Supermarket receipt scanner and categorizer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "bonscan.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set BONSCAN_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed the category mappings
    Init,

    /// Scan an OCR text file into a categorized receipt
    Scan {
        /// Text file with the OCR output of a receipt photo
        #[arg(short, long)]
        file: PathBuf,

        /// Store name, for receipts where the store is not recognized
        #[arg(short, long)]
        store: Option<String>,

        /// Skip the AI extraction chain on discrepancies
        #[arg(long)]
        no_ai: bool,
    },

    /// Re-run the AI extraction chain for a stored receipt (max 3 attempts)
    Reextract {
        /// Receipt ID
        receipt_id: i64,
    },

    /// Manage scanned receipts (list, show, delete, set-store)
    Receipts {
        #[command(subcommand)]
        action: Option<ReceiptsAction>,
    },

    /// Show which category an item name resolves to
    Categorize {
        /// Item name as it appears on a receipt
        name: String,
    },

    /// Manage keyword-to-category mappings (list, add)
    Mappings {
        #[command(subcommand)]
        action: Option<MappingsAction>,
    },

    /// Let the AI classifier learn mappings from a product description
    Learn {
        /// Free-text product description(s)
        #[arg(short, long)]
        text: String,
    },

    /// Inspect the AI provider chain (list, health)
    Providers {
        #[command(subcommand)]
        action: Option<ProvidersAction>,
    },

    /// Show database status and category statistics
    Status,
}

#[derive(Subcommand)]
pub enum ReceiptsAction {
    /// List scanned receipts
    List {
        /// Maximum number of receipts to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show one receipt with its items
    Show {
        /// Receipt ID
        receipt_id: i64,
    },
    /// Delete a receipt and its items
    Delete {
        /// Receipt ID
        receipt_id: i64,
    },
    /// Set the store name for a receipt that needed manual entry
    SetStore {
        /// Receipt ID
        receipt_id: i64,
        /// Store name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum MappingsAction {
    /// List stored mappings in resolution order
    List,
    /// Add a keyword-to-category mapping
    Add {
        /// Keyword (normalized to lowercase)
        keyword: String,
        /// Category (Fruits, Vegetables, Dairy, Meat, Bakery, Beverages,
        /// Snacks, Cereals, Sweets, Oils, Other)
        category: String,
    },
}

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List the configured provider chain in fallback order
    List,
    /// Check which providers are reachable
    Health,
    /// Send a sample extraction through the chain
    Test,
}
