//! Provider chain commands

use anyhow::{bail, Context, Result};
use bonscan_core::{ChainConfig, Error, ProviderBackend, ProviderChain};

pub fn cmd_providers_list() -> Result<()> {
    let config = ChainConfig::load().context("Failed to load provider config")?;

    if config.providers.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    println!("Provider chain (tried in this order):");
    for (index, entry) in config.providers.iter().enumerate() {
        println!(
            "  {}. {} (model {}, timeout {}s{})",
            index + 1,
            entry.name,
            entry.model,
            entry.timeout().as_secs(),
            entry
                .url
                .as_deref()
                .map(|u| format!(", {}", u))
                .unwrap_or_default()
        );
    }

    if let Some(path) = ChainConfig::default_path() {
        println!();
        println!("Override file: {}", path.display());
    }

    Ok(())
}

pub async fn cmd_providers_health() -> Result<()> {
    let config = ChainConfig::load().context("Failed to load provider config")?;
    let chain = ProviderChain::from_config(&config).context("Failed to build provider chain")?;

    if chain.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    println!("🏥 Checking provider reachability...");
    for provider in chain.providers() {
        let healthy = provider.health_check().await;
        println!(
            "   {} {} ({})",
            if healthy { "✅" } else { "❌" },
            provider.name(),
            provider.host()
        );
    }

    Ok(())
}

/// Sample receipt text sent by `providers test`
const SAMPLE_RECEIPT: &str = "MILCH 1,09 B\nBROT 2,19 B\nSUMME 3,28";

pub async fn cmd_providers_test() -> Result<()> {
    let Some(chain) = super::build_chain(false)? else {
        println!("No providers configured.");
        return Ok(());
    };

    println!("🧪 Sending a sample extraction through the chain...");

    match chain.extract_items(SAMPLE_RECEIPT).await {
        Ok(result) => {
            println!(
                "✅ Provider \"{}\" answered with {} item(s).",
                result.provider,
                result.value.len()
            );
            for failure in &result.failures {
                println!("   (tried first: {}: {})", failure.provider, failure.message);
            }
            Ok(())
        }
        Err(Error::ProviderChain(failures)) => {
            let detail: Vec<String> = failures
                .iter()
                .map(|f| format!("{}: {}", f.provider, f.message))
                .collect();
            bail!("Every provider failed ({}).", detail.join("; "));
        }
        Err(e) => Err(e.into()),
    }
}
