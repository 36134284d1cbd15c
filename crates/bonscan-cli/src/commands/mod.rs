//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, status) and shared utilities (open_db)
//! - `mappings` - Mapping commands (list, add, categorize, learn)
//! - `providers` - Provider chain commands (list, health, test)
//! - `receipts` - Receipt commands (list, show, delete, set-store)
//! - `scan` - Scan and re-extraction commands

pub mod core;
pub mod mappings;
pub mod providers;
pub mod receipts;
pub mod scan;

// Re-export command functions for main.rs
pub use self::core::*;
pub use mappings::*;
pub use providers::*;
pub use receipts::*;
pub use scan::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
