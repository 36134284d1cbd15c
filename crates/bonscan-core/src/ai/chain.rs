//! Ordered provider fallback chain
//!
//! Providers are tried strictly in configuration order and the chain stops
//! at the first success. Earlier providers are preferred for cost and
//! quality, so there is no racing. A provider gets exactly one try per
//! chain run; its failure is recorded by name and the next provider is
//! attempted. Only when every provider failed does the chain raise one
//! aggregate error naming all of them.
//!
//! Each call is driven through an explicit state machine
//! (`Pending(index) -> Success | exhausted`) with a per-call timeout; a
//! timeout is treated like any other provider failure.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{Error, ProviderFailure, Result};
use crate::prompts::{PromptId, PromptLibrary};

use super::config::{ChainConfig, ProviderKind};
use super::http::HttpProvider;
use super::mock::MockProvider;
use super::types::{ChainResult, ExtractedItem, KeywordSuggestion};
use super::{ProviderBackend, ProviderClient};

/// Chain traversal state
enum ChainState<T> {
    /// Waiting to try the provider at this index
    Pending(usize),
    /// A provider succeeded
    Success { index: usize, value: T },
}

/// Ordered chain of text-completion providers
pub struct ProviderChain {
    providers: Vec<ProviderClient>,
    prompts: Mutex<PromptLibrary>,
}

impl ProviderChain {
    /// Build a chain from explicit providers (order = fallback order)
    pub fn new(providers: Vec<ProviderClient>) -> Self {
        Self {
            providers,
            prompts: Mutex::new(PromptLibrary::new()),
        }
    }

    /// Build a chain from configuration
    pub fn from_config(config: &ChainConfig) -> Result<Self> {
        let mut providers = Vec::with_capacity(config.providers.len());

        for entry in &config.providers {
            let client = match entry.kind {
                ProviderKind::Http => {
                    let url = entry.url.as_deref().ok_or_else(|| {
                        Error::InvalidData(format!("provider {} is missing a url", entry.name))
                    })?;
                    let mut provider = HttpProvider::new(&entry.name, url, &entry.model)
                        .with_temperature(entry.temperature)
                        .with_timeout(entry.timeout());
                    if let Some(ref var) = entry.api_key_env {
                        if let Ok(key) = std::env::var(var) {
                            provider = provider.with_api_key(&key);
                        } else {
                            debug!(provider = entry.name.as_str(), env = var.as_str(), "api key env not set");
                        }
                    }
                    ProviderClient::Http(provider)
                }
                ProviderKind::Mock => ProviderClient::Mock(MockProvider::new(&entry.name)),
            };
            providers.push(client);
        }

        Ok(Self::new(providers))
    }

    /// Number of providers in the chain
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names, in fallback order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Providers for inspection (health checks in the CLI)
    pub fn providers(&self) -> &[ProviderClient] {
        &self.providers
    }

    /// Extract line items from receipt text via the fallback chain.
    ///
    /// Succeeds with the first provider that answers; a well-formed but
    /// empty item list counts as success. Fails with an aggregate error
    /// only when every provider failed.
    pub async fn extract_items(
        &self,
        receipt_text: &str,
    ) -> Result<ChainResult<Vec<ExtractedItem>>> {
        let (system, user) = self.render(PromptId::ExtractReceipt, "receipt_text", receipt_text)?;

        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut state: ChainState<Vec<ExtractedItem>> = ChainState::Pending(0);

        loop {
            state = match state {
                ChainState::Pending(index) => {
                    let Some(provider) = self.providers.get(index) else {
                        warn!(providers = self.providers.len(), "extraction chain exhausted");
                        return Err(Error::ProviderChain(failures));
                    };
                    match tokio::time::timeout(
                        provider.timeout(),
                        provider.extract_items(&system, &user),
                    )
                    .await
                    {
                        Ok(Ok(items)) => ChainState::Success {
                            index,
                            value: items,
                        },
                        Ok(Err(e)) => {
                            self.record_failure(&mut failures, index, e.to_string());
                            ChainState::Pending(index + 1)
                        }
                        Err(_) => {
                            self.record_failure(&mut failures, index, "timed out".to_string());
                            ChainState::Pending(index + 1)
                        }
                    }
                }
                ChainState::Success { index, value } => {
                    let provider = self.providers[index].name().to_string();
                    info!(
                        provider = provider.as_str(),
                        items = value.len(),
                        failed_before = failures.len(),
                        "extraction succeeded"
                    );
                    return Ok(ChainResult {
                        value,
                        provider,
                        failures,
                    });
                }
            };
        }
    }

    /// Classify product descriptions into keyword/category pairs via the
    /// same fallback discipline.
    pub async fn classify_products(
        &self,
        text: &str,
    ) -> Result<ChainResult<Vec<KeywordSuggestion>>> {
        let (system, user) = self.render(PromptId::ClassifyProducts, "text", text)?;

        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut state: ChainState<Vec<KeywordSuggestion>> = ChainState::Pending(0);

        loop {
            state = match state {
                ChainState::Pending(index) => {
                    let Some(provider) = self.providers.get(index) else {
                        warn!(providers = self.providers.len(), "classification chain exhausted");
                        return Err(Error::ProviderChain(failures));
                    };
                    match tokio::time::timeout(
                        provider.timeout(),
                        provider.classify_products(&system, &user),
                    )
                    .await
                    {
                        Ok(Ok(suggestions)) => ChainState::Success {
                            index,
                            value: suggestions,
                        },
                        Ok(Err(e)) => {
                            self.record_failure(&mut failures, index, e.to_string());
                            ChainState::Pending(index + 1)
                        }
                        Err(_) => {
                            self.record_failure(&mut failures, index, "timed out".to_string());
                            ChainState::Pending(index + 1)
                        }
                    }
                }
                ChainState::Success { index, value } => {
                    let provider = self.providers[index].name().to_string();
                    info!(
                        provider = provider.as_str(),
                        suggestions = value.len(),
                        "classification succeeded"
                    );
                    return Ok(ChainResult {
                        value,
                        provider,
                        failures,
                    });
                }
            };
        }
    }

    fn record_failure(&self, failures: &mut Vec<ProviderFailure>, index: usize, message: String) {
        let name = self.providers[index].name().to_string();
        warn!(provider = name.as_str(), error = message.as_str(), "provider failed");
        failures.push(ProviderFailure {
            provider: name,
            message,
        });
    }

    /// Render the system prompt and user content for a prompt id
    fn render(&self, id: PromptId, var: &str, value: &str) -> Result<(String, String)> {
        let mut prompts = self
            .prompts
            .lock()
            .map_err(|_| Error::InvalidData("prompt library lock poisoned".into()))?;
        let prompt = prompts.get(id)?;
        let system = prompt
            .system_section()
            .unwrap_or_default()
            .to_string();
        let mut vars = HashMap::new();
        vars.insert(var, value);
        let user = prompt.render_user(&vars);
        Ok((system, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(providers: Vec<ProviderClient>) -> ProviderChain {
        ProviderChain::new(providers)
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let chain = chain_of(vec![
            ProviderClient::Mock(MockProvider::new("first")),
            ProviderClient::Mock(MockProvider::new("second")),
        ]);

        let result = chain.extract_items("BON TEXT").await.unwrap();
        assert_eq!(result.provider, "first");
        assert!(result.failures.is_empty());
        assert_eq!(result.value.len(), 1);
        assert_eq!(result.value[0].name, "Milch");
    }

    #[tokio::test]
    async fn test_fallback_records_failures_then_succeeds() {
        let chain = chain_of(vec![
            ProviderClient::Mock(MockProvider::failing("first")),
            ProviderClient::Mock(MockProvider::failing("second")),
            ProviderClient::Mock(MockProvider::new("third")),
        ]);

        let result = chain.extract_items("BON TEXT").await.unwrap();
        assert_eq!(result.provider, "third");
        assert_eq!(result.value[0].name, "Milch");
        assert_eq!(result.value[0].price, 1.29);

        // Two recorded errors, keyed by provider name, not an exception.
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].provider, "first");
        assert_eq!(result.failures[1].provider, "second");
    }

    #[tokio::test]
    async fn test_all_providers_failing_raises_aggregate_error() {
        let chain = chain_of(vec![
            ProviderClient::Mock(MockProvider::failing("alpha")),
            ProviderClient::Mock(MockProvider::failing("beta")),
            ProviderClient::Mock(MockProvider::failing("gamma")),
        ]);

        let err = chain.extract_items("BON TEXT").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("alpha"));
        assert!(message.contains("beta"));
        assert!(message.contains("gamma"));

        match err {
            Error::ProviderChain(failures) => assert_eq!(failures.len(), 3),
            other => panic!("expected ProviderChain error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted_immediately() {
        let chain = chain_of(vec![]);
        let err = chain.extract_items("BON TEXT").await.unwrap_err();
        assert!(matches!(err, Error::ProviderChain(ref f) if f.is_empty()));
    }

    #[tokio::test]
    async fn test_classification_uses_same_fallback() {
        let chain = chain_of(vec![
            ProviderClient::Mock(MockProvider::failing("first")),
            ProviderClient::Mock(MockProvider::new("second")),
        ]);

        let result = chain.classify_products("Vollmilch 3,5%").await.unwrap();
        assert_eq!(result.provider, "second");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.value[0].keyword, "vollmilch");
    }

    #[test]
    fn test_from_config_builds_in_order() {
        let config = ChainConfig::parse(
            r#"
            [[providers]]
            name = "a"
            url = "http://a.example/v1/chat/completions"

            [[providers]]
            name = "b"
            kind = "mock"
            "#,
        )
        .unwrap();

        let chain = ProviderChain::from_config(&config).unwrap();
        assert_eq!(chain.provider_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_config_requires_url_for_http() {
        let config = ChainConfig::parse(
            r#"
            [[providers]]
            name = "broken"
            "#,
        )
        .unwrap();

        assert!(ProviderChain::from_config(&config).is_err());
    }
}
