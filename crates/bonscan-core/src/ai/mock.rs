//! Mock provider for testing
//!
//! Returns predictable extraction and classification results, or fails on
//! every call when constructed with `failing()`, useful for exercising the
//! fallback chain without a network.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Category;

use super::types::{ExtractedItem, KeywordSuggestion};
use super::ProviderBackend;

/// Mock provider backend
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    fail: bool,
}

impl MockProvider {
    /// A mock that answers every call
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
        }
    }

    /// A mock that raises on every call
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: true,
        }
    }
}

#[async_trait]
impl ProviderBackend for MockProvider {
    async fn extract_items(
        &self,
        _system_prompt: &str,
        _receipt_text: &str,
    ) -> Result<Vec<ExtractedItem>> {
        if self.fail {
            return Err(Error::InvalidData(format!(
                "mock provider {} failure",
                self.name
            )));
        }

        Ok(vec![ExtractedItem {
            name: "Milch".to_string(),
            category: Some("Dairy".to_string()),
            price: 1.29,
            quantity: None,
        }])
    }

    async fn classify_products(
        &self,
        _system_prompt: &str,
        _text: &str,
    ) -> Result<Vec<KeywordSuggestion>> {
        if self.fail {
            return Err(Error::InvalidData(format!(
                "mock provider {} failure",
                self.name
            )));
        }

        Ok(vec![
            KeywordSuggestion {
                keyword: "vollmilch".to_string(),
                category: Category::Dairy,
            },
            KeywordSuggestion {
                keyword: "apfelschorle".to_string(),
                category: Category::Beverages,
            },
        ])
    }

    async fn health_check(&self) -> bool {
        !self.fail
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_extract() {
        let mock = MockProvider::new("mock");
        let items = mock.extract_items("", "").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milch");
        assert!(mock.health_check().await);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockProvider::failing("broken");
        assert!(mock.extract_items("", "").await.is_err());
        assert!(mock.classify_products("", "").await.is_err());
        assert!(!mock.health_check().await);
    }
}
