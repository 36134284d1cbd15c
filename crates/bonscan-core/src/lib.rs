//! Bonscan Core Library
//!
//! Shared functionality for the Bonscan receipt scanner:
//! - Price/number normalization for noisy OCR text
//! - Per-vendor receipt parsers with a generic fallback grammar
//! - Total reconciliation with discrepancy detection
//! - Keyword-based category resolution with a learnable mapping store
//! - AI extraction fallback chain over external text-completion providers
//! - Database access and migrations

pub mod ai;
pub mod categorize;
pub mod db;
pub mod error;
pub mod models;
pub mod money;
pub mod parse;
pub mod prompts;
pub mod reconcile;
pub mod scan;

/// Test utilities including the mock provider server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    ChainConfig, ChainResult, ExtractedItem, HttpProvider, KeywordSuggestion, MockProvider,
    ProviderBackend, ProviderChain, ProviderClient, ProviderEntry, ProviderKind,
};
pub use categorize::{learn_mappings, CategoryResolver};
pub use db::Database;
pub use error::{Error, ProviderFailure, Result};
pub use models::{
    Category, CategoryMapping, ItemRecord, ItemSource, MappingSource, NewMapping, ParsedReceipt,
    ReceiptItem, ReceiptRecord, TaxBreakdown, TaxClass, TotalMethod, Vendor, UNKNOWN_STORE,
};
pub use parse::{detect_vendor, parse_receipt, parse_with_vendor};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use reconcile::{reconcile, recompute, Reconciliation, TOLERANCE};
pub use scan::{ScanPipeline, ScanReport};
