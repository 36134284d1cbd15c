//! Category resolution engine
//!
//! Maps free-text item names onto the fixed category set using the
//! persisted keyword mapping table. Two-tier matching: an exact-match index
//! is consulted first, then substring matching over all stored keywords.
//! Resolution is total: anything unmatched is `Other`, never an error.

use std::collections::HashMap;

use tracing::debug;

use crate::ai::KeywordSuggestion;
use crate::db::Database;
use crate::error::Result;
use crate::models::{Category, CategoryMapping, MappingSource, NewMapping, ReceiptItem};

/// In-memory snapshot of the mapping table.
///
/// The table is read once per scan; per-item resolution is then a pure
/// lookup, safe to run in any order. Rebuild the resolver after inserting
/// new mappings.
pub struct CategoryResolver {
    /// Exact-match index. For duplicate keywords the earliest-inserted row
    /// wins, matching the store's lookup semantics.
    by_keyword: HashMap<String, Category>,
    /// All mappings in insertion order, for substring matching
    ordered: Vec<CategoryMapping>,
}

impl CategoryResolver {
    /// Load the current mapping table from the database
    pub fn load(db: &Database) -> Result<Self> {
        Ok(Self::from_mappings(db.all_mappings()?))
    }

    /// Build a resolver from an explicit mapping list (for testing)
    pub fn from_mappings(ordered: Vec<CategoryMapping>) -> Self {
        let mut by_keyword = HashMap::with_capacity(ordered.len());
        for mapping in &ordered {
            by_keyword
                .entry(mapping.keyword.clone())
                .or_insert(mapping.category);
        }
        Self {
            by_keyword,
            ordered,
        }
    }

    /// Number of mappings in this snapshot
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Resolve an item name to exactly one category.
    ///
    /// Exact keyword equality always wins over a merely-substring match,
    /// regardless of table order, because the exact check runs first. Among
    /// substring matches the longest keyword wins; equal lengths fall back
    /// to insertion order.
    pub fn resolve(&self, item_name: &str) -> Category {
        let normalized = item_name.trim().to_lowercase();
        if normalized.is_empty() {
            return Category::Other;
        }

        if let Some(&category) = self.by_keyword.get(&normalized) {
            return category;
        }

        let mut best: Option<&CategoryMapping> = None;
        for mapping in &self.ordered {
            if mapping.keyword.is_empty() || !normalized.contains(&mapping.keyword) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => mapping.keyword.len() > current.keyword.len(),
            };
            if better {
                best = Some(mapping);
            }
        }

        match best {
            Some(mapping) => {
                debug!(
                    item = item_name,
                    keyword = mapping.keyword.as_str(),
                    category = %mapping.category,
                    "substring match"
                );
                mapping.category
            }
            None => Category::Other,
        }
    }

    /// Assign a category to every item in place
    pub fn categorize_items(&self, items: &mut [ReceiptItem]) {
        for item in items {
            item.category = self.resolve(&item.name);
        }
    }
}

/// Append AI-suggested mappings to the store.
///
/// Suggestions are normalized and inserted verbatim without deduplication;
/// one sequential bulk insert keeps the batch's append order intact for the
/// resolver's tie-break. Empty keywords are skipped.
pub fn learn_mappings(db: &Database, suggestions: &[KeywordSuggestion]) -> Result<usize> {
    let new: Vec<NewMapping> = suggestions
        .iter()
        .filter(|s| !s.keyword.trim().is_empty())
        .map(|s| NewMapping::normalized(&s.keyword, s.category, MappingSource::Ai))
        .collect();

    if new.is_empty() {
        return Ok(0);
    }
    db.insert_mappings(&new)
}
