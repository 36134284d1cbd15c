//! Bonscan CLI - Receipt scanner and categorizer
//!
//! Usage:
//!   bonscan init                 Initialize database
//!   bonscan scan --file OCR.txt  Scan a receipt (auto-detects the vendor)
//!   bonscan receipts             List scanned receipts
//!   bonscan categorize "MILCH"   Test category resolution

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Scan { file, store, no_ai } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            db.seed_default_mappings()?;
            commands::cmd_scan(&db, &file, store.as_deref(), no_ai).await
        }
        Commands::Reextract { receipt_id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_reextract(&db, receipt_id).await
        }
        Commands::Receipts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_receipts_list(&db, 20),
                Some(ReceiptsAction::List { limit }) => commands::cmd_receipts_list(&db, limit),
                Some(ReceiptsAction::Show { receipt_id }) => {
                    commands::cmd_receipts_show(&db, receipt_id)
                }
                Some(ReceiptsAction::Delete { receipt_id }) => {
                    commands::cmd_receipts_delete(&db, receipt_id)
                }
                Some(ReceiptsAction::SetStore { receipt_id, name }) => {
                    commands::cmd_receipts_set_store(&db, receipt_id, &name)
                }
            }
        }
        Commands::Categorize { name } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            db.seed_default_mappings()?;
            commands::cmd_categorize(&db, &name)
        }
        Commands::Mappings { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(MappingsAction::List) => commands::cmd_mappings_list(&db),
                Some(MappingsAction::Add { keyword, category }) => {
                    commands::cmd_mappings_add(&db, &keyword, &category)
                }
            }
        }
        Commands::Learn { text } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_learn(&db, &text).await
        }
        Commands::Providers { action } => match action {
            None | Some(ProvidersAction::List) => commands::cmd_providers_list(),
            Some(ProvidersAction::Health) => commands::cmd_providers_health().await,
            Some(ProvidersAction::Test) => commands::cmd_providers_test().await,
        },
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
    }
}
