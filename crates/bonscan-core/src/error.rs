//! Error types for Bonscan

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Receipt-level failure: no usable items (and no total). The caller
    /// must delete any in-progress record and surface the message.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate receipt: {0}")]
    Duplicate(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Every provider in the chain failed; carries one entry per provider.
    #[error("All providers failed: {}", format_failures(.0))]
    ProviderChain(Vec<ProviderFailure>),

    #[error("Extraction attempts exhausted for receipt {receipt_id} ({attempts}/{max})")]
    AttemptsExhausted {
        receipt_id: i64,
        attempts: i64,
        max: i64,
    },
}

/// A single provider's failure, recorded by the fallback chain
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
