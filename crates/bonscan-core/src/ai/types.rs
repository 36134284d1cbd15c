//! Provider response types
//!
//! These types are backend-agnostic and used across all provider
//! implementations.

use serde::{Deserialize, Serialize};

use crate::models::Category;

/// A line item extracted by a text-completion provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// Item name, non-empty after validation
    pub name: String,
    /// Category as suggested by the provider. Advisory only; the
    /// resolution engine has the final word.
    #[serde(default)]
    pub category: Option<String>,
    /// Validated to lie in (0, 1000)
    pub price: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
}

/// A keyword-to-category pair proposed by the AI classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSuggestion {
    pub keyword: String,
    pub category: Category,
}

/// Successful chain outcome: the winning provider's value plus the failures
/// recorded from the providers tried before it
#[derive(Debug, Clone)]
pub struct ChainResult<T> {
    pub value: T,
    /// Name of the provider that succeeded
    pub provider: String,
    pub failures: Vec<crate::error::ProviderFailure>,
}
