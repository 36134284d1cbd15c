//! Keyword-to-category mapping store and category statistics

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Category, CategoryMapping, MappingSource, NewMapping};

/// Seed mappings installed on first run. Keywords are stored normalized
/// (lowercase); umlauts appear both as-is and ASCII-folded because OCR
/// output is inconsistent about them.
const SEED_MAPPINGS: &[(&str, Category)] = &[
    ("apfel", Category::Fruits),
    ("banane", Category::Fruits),
    ("birne", Category::Fruits),
    ("orange", Category::Fruits),
    ("zitrone", Category::Fruits),
    ("traube", Category::Fruits),
    ("erdbeere", Category::Fruits),
    ("tomate", Category::Vegetables),
    ("gurke", Category::Vegetables),
    ("salat", Category::Vegetables),
    ("kartoffel", Category::Vegetables),
    ("zwiebel", Category::Vegetables),
    ("paprika", Category::Vegetables),
    ("möhre", Category::Vegetables),
    ("moehre", Category::Vegetables),
    ("milch", Category::Dairy),
    ("joghurt", Category::Dairy),
    ("käse", Category::Dairy),
    ("kaese", Category::Dairy),
    ("butter", Category::Dairy),
    ("quark", Category::Dairy),
    ("sahne", Category::Dairy),
    ("hähnchen", Category::Meat),
    ("haehnchen", Category::Meat),
    ("rind", Category::Meat),
    ("schwein", Category::Meat),
    ("wurst", Category::Meat),
    ("salami", Category::Meat),
    ("hackfleisch", Category::Meat),
    ("brot", Category::Bakery),
    ("brötchen", Category::Bakery),
    ("broetchen", Category::Bakery),
    ("brezel", Category::Bakery),
    ("croissant", Category::Bakery),
    ("toast", Category::Bakery),
    ("wasser", Category::Beverages),
    ("saft", Category::Beverages),
    ("cola", Category::Beverages),
    ("bier", Category::Beverages),
    ("wein", Category::Beverages),
    ("kaffee", Category::Beverages),
    ("tee", Category::Beverages),
    ("chips", Category::Snacks),
    ("nüsse", Category::Snacks),
    ("nuesse", Category::Snacks),
    ("cracker", Category::Snacks),
    ("salzstangen", Category::Snacks),
    ("müsli", Category::Cereals),
    ("muesli", Category::Cereals),
    ("haferflocken", Category::Cereals),
    ("cornflakes", Category::Cereals),
    ("reis", Category::Cereals),
    ("mehl", Category::Cereals),
    ("schokolade", Category::Sweets),
    ("gummibär", Category::Sweets),
    ("bonbon", Category::Sweets),
    ("keks", Category::Sweets),
    ("eis", Category::Sweets),
    ("öl", Category::Oils),
    ("oel", Category::Oils),
    ("olivenöl", Category::Oils),
    ("margarine", Category::Oils),
];

impl Database {
    /// All mappings in insertion order (rowid ascending)
    pub fn all_mappings(&self) -> Result<Vec<CategoryMapping>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, keyword, category, source, created_at
             FROM category_mappings ORDER BY id ASC",
        )?;

        let mappings = stmt
            .query_map([], Self::row_to_mapping)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mappings)
    }

    /// Exact keyword lookup; the earliest-inserted row wins for duplicates
    pub fn lookup_keyword(&self, keyword: &str) -> Result<Option<CategoryMapping>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, keyword, category, source, created_at
             FROM category_mappings WHERE keyword = ? ORDER BY id ASC LIMIT 1",
        )?;

        let mapping = stmt
            .query_row(params![keyword.trim().to_lowercase()], Self::row_to_mapping)
            .optional()?;

        Ok(mapping)
    }

    /// Append mappings in one transaction, preserving batch order.
    ///
    /// Sequential inserts inside a single transaction keep the insertion
    /// order well defined, which the resolver's tie-break depends on.
    /// Duplicate keywords are allowed.
    pub fn insert_mappings(&self, mappings: &[NewMapping]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO category_mappings (keyword, category, source) VALUES (?, ?, ?)",
            )?;
            for mapping in mappings {
                stmt.execute(params![
                    mapping.keyword.trim().to_lowercase(),
                    mapping.category.as_str(),
                    mapping.source.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(mappings.len())
    }

    /// Install the seed mappings if the table is empty
    pub fn seed_default_mappings(&self) -> Result<usize> {
        let count = self.mapping_count()?;
        if count > 0 {
            return Ok(0);
        }

        let seeds: Vec<NewMapping> = SEED_MAPPINGS
            .iter()
            .map(|(keyword, category)| {
                NewMapping::normalized(keyword, *category, MappingSource::Seed)
            })
            .collect();

        let inserted = self.insert_mappings(&seeds)?;
        info!(count = inserted, "seeded category mappings");
        Ok(inserted)
    }

    /// Number of stored mappings
    pub fn mapping_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM category_mappings", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Bump the item counter for a category
    pub fn increment_category_count(&self, category: Category) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO category_stats (category, item_count) VALUES (?, 1)
             ON CONFLICT(category) DO UPDATE SET item_count = item_count + 1",
            params![category.as_str()],
        )?;
        Ok(())
    }

    /// Item counts per category, highest first
    pub fn category_counts(&self) -> Result<Vec<(Category, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, item_count FROM category_stats ORDER BY item_count DESC",
        )?;

        let counts = stmt
            .query_map([], |row| {
                let category: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((category, count))
            })?
            .collect::<std::result::Result<Vec<(String, i64)>, _>>()?;

        Ok(counts
            .into_iter()
            .filter_map(|(c, n)| c.parse::<Category>().ok().map(|cat| (cat, n)))
            .collect())
    }

    fn row_to_mapping(row: &rusqlite::Row) -> rusqlite::Result<CategoryMapping> {
        let category: String = row.get(2)?;
        let source: String = row.get(3)?;
        let created_at: String = row.get(4)?;

        Ok(CategoryMapping {
            id: row.get(0)?,
            keyword: row.get(1)?,
            category: category.parse().unwrap_or(Category::Other),
            source: source.parse().unwrap_or(MappingSource::Seed),
            created_at: parse_datetime(&created_at),
        })
    }
}
