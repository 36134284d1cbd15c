//! AI extraction fallback chain
//!
//! When deterministic parsing under-extracts, the scan pipeline delegates
//! to external text-completion providers, tried in a fixed order with
//! recorded-error fallback.
//!
//! # Architecture
//!
//! - `ProviderBackend` trait: the interface every provider implements
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time
//!   dispatch
//! - `ProviderChain`: the ordered fallback state machine
//! - `parsing`: tolerant decoding of table/JSON response bodies

pub mod chain;
pub mod config;
mod http;
mod mock;
pub mod parsing;
pub mod types;

pub use chain::ProviderChain;
pub use config::{ChainConfig, ProviderEntry, ProviderKind};
pub use http::HttpProvider;
pub use mock::MockProvider;
pub use types::{ChainResult, ExtractedItem, KeywordSuggestion};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all providers
///
/// Backends are Send + Sync so the chain can be shared across async tasks.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    /// Extract line items from receipt text
    async fn extract_items(
        &self,
        system_prompt: &str,
        receipt_text: &str,
    ) -> Result<Vec<ExtractedItem>>;

    /// Classify product descriptions into keyword/category pairs
    async fn classify_products(
        &self,
        system_prompt: &str,
        text: &str,
    ) -> Result<Vec<KeywordSuggestion>>;

    /// Check if the provider endpoint is reachable
    async fn health_check(&self) -> bool;

    /// Provider name (used in logs and error aggregation)
    fn name(&self) -> &str;

    /// Model name (for diagnostics)
    fn model(&self) -> &str;

    /// Endpoint URL (for logging)
    fn host(&self) -> &str;

    /// Per-call timeout for this provider
    fn timeout(&self) -> Duration;
}

/// Concrete provider enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ProviderClient {
    /// HTTP text-completion endpoint
    Http(HttpProvider),
    /// Mock provider for testing
    Mock(MockProvider),
}

#[async_trait]
impl ProviderBackend for ProviderClient {
    async fn extract_items(
        &self,
        system_prompt: &str,
        receipt_text: &str,
    ) -> Result<Vec<ExtractedItem>> {
        match self {
            ProviderClient::Http(p) => p.extract_items(system_prompt, receipt_text).await,
            ProviderClient::Mock(p) => p.extract_items(system_prompt, receipt_text).await,
        }
    }

    async fn classify_products(
        &self,
        system_prompt: &str,
        text: &str,
    ) -> Result<Vec<KeywordSuggestion>> {
        match self {
            ProviderClient::Http(p) => p.classify_products(system_prompt, text).await,
            ProviderClient::Mock(p) => p.classify_products(system_prompt, text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::Http(p) => p.health_check().await,
            ProviderClient::Mock(p) => p.health_check().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ProviderClient::Http(p) => p.name(),
            ProviderClient::Mock(p) => p.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderClient::Http(p) => p.model(),
            ProviderClient::Mock(p) => p.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::Http(p) => p.host(),
            ProviderClient::Mock(p) => p.host(),
        }
    }

    fn timeout(&self) -> Duration {
        match self {
            ProviderClient::Http(p) => p.timeout(),
            ProviderClient::Mock(p) => p.timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_delegates_to_mock() {
        let client = ProviderClient::Mock(MockProvider::new("mock"));
        assert_eq!(client.name(), "mock");
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert!(client.health_check().await);
    }
}
