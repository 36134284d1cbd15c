//! Domain models for Bonscan

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel store name used when no vendor signature matched and the
/// receipt header gave nothing usable. Callers check `needs_store_name()`
/// and prompt for manual entry instead of guessing.
pub const UNKNOWN_STORE: &str = "Unknown Store";

/// Supported receipt vendors, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Rewe,
    Edeka,
    Lidl,
    Aldi,
    /// Fallback grammar for unrecognized stores
    Generic,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rewe => "rewe",
            Self::Edeka => "edeka",
            Self::Lidl => "lidl",
            Self::Aldi => "aldi",
            Self::Generic => "generic",
        }
    }
}

impl std::str::FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rewe" => Ok(Self::Rewe),
            "edeka" => Ok(Self::Edeka),
            "lidl" => Ok(Self::Lidl),
            "aldi" => Ok(Self::Aldi),
            "generic" => Ok(Self::Generic),
            _ => Err(format!("Unknown vendor: {}", s)),
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grocery categories. Closed set shared with the persistence layer;
/// adding a category is a coordinated schema change, never a dynamic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fruits,
    Vegetables,
    Dairy,
    Meat,
    Bakery,
    Beverages,
    Snacks,
    Cereals,
    Sweets,
    Oils,
    /// Universal fallback: every item resolves to exactly one category
    Other,
}

impl Category {
    /// All categories, in the order used by prompts and reports
    pub const ALL: [Category; 11] = [
        Self::Fruits,
        Self::Vegetables,
        Self::Dairy,
        Self::Meat,
        Self::Bakery,
        Self::Beverages,
        Self::Snacks,
        Self::Cereals,
        Self::Sweets,
        Self::Oils,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fruits => "Fruits",
            Self::Vegetables => "Vegetables",
            Self::Dairy => "Dairy",
            Self::Meat => "Meat",
            Self::Bakery => "Bakery",
            Self::Beverages => "Beverages",
            Self::Snacks => "Snacks",
            Self::Cereals => "Cereals",
            Self::Sweets => "Sweets",
            Self::Oils => "Oils",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fruits" | "fruit" => Ok(Self::Fruits),
            "vegetables" | "vegetable" => Ok(Self::Vegetables),
            "dairy" => Ok(Self::Dairy),
            "meat" => Ok(Self::Meat),
            "bakery" => Ok(Self::Bakery),
            "beverages" | "beverage" => Ok(Self::Beverages),
            "snacks" | "snack" => Ok(Self::Snacks),
            "cereals" | "cereal" => Ok(Self::Cereals),
            "sweets" | "sweet" => Ok(Self::Sweets),
            "oils" | "oil" => Ok(Self::Oils),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// VAT rate class as printed on German receipts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaxClass {
    /// Regular rate, 19%
    A,
    /// Reduced rate, 7%
    B,
    /// Decimal-string fallback for receipts without letter classes,
    /// e.g. "19.0"
    Rate(String),
}

impl TaxClass {
    pub fn code(&self) -> &str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::Rate(s) => s,
        }
    }

    /// Rate as a fraction (0.19, 0.07, ...)
    pub fn rate(&self) -> Option<f64> {
        match self {
            Self::A => Some(0.19),
            Self::B => Some(0.07),
            Self::Rate(s) => s.replace(',', ".").parse::<f64>().ok().map(|p| p / 100.0),
        }
    }

    /// Map a printed percentage like "19,0" or "7.0" to a class
    pub fn from_percent(percent: &str) -> Self {
        let normalized = percent.replace(',', ".");
        match normalized.parse::<f64>() {
            Ok(p) if (p - 19.0).abs() < 0.01 => Self::A,
            Ok(p) if (p - 7.0).abs() < 0.01 => Self::B,
            _ => Self::Rate(normalized),
        }
    }
}

impl std::str::FromStr for TaxClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other if !other.is_empty() => Ok(Self::Rate(other.replace(',', "."))),
            _ => Err("Empty tax class".to_string()),
        }
    }
}

impl std::fmt::Display for TaxClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// Extracted by a vendor parser
    #[default]
    Parser,
    /// Supplementary item from the AI extraction chain
    Ai,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Ai => "ai",
        }
    }
}

impl std::str::FromStr for ItemSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parser" => Ok(Self::Parser),
            "ai" => Ok(Self::Ai),
            _ => Err(format!("Unknown item source: {}", s)),
        }
    }
}

/// A purchased line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    /// Free text, as extracted
    pub name: String,
    pub category: Category,
    /// Always > 0 for items surviving validation
    pub total_price: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub tax_class: Option<TaxClass>,
    #[serde(default)]
    pub source: ItemSource,
}

/// Per-rate-class tax subtotals (net/tax/gross)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub class: TaxClass,
    pub net: f64,
    pub tax: f64,
    pub gross: f64,
}

/// How the receipt total was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalMethod {
    /// Printed on the receipt and parsed
    Explicit,
    /// No printed total found; sum of item prices used instead
    Calculated,
}

impl TotalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Calculated => "calculated",
        }
    }
}

impl std::str::FromStr for TotalMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "calculated" => Ok(Self::Calculated),
            _ => Err(format!("Unknown total method: {}", s)),
        }
    }
}

/// Structured result of parsing one OCR text.
///
/// Created by exactly one vendor parser invocation. The scan pipeline may
/// append AI-extracted supplementary items afterwards; it must then
/// recompute `discrepancy_detected` via `reconcile::recompute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    pub vendor: Vendor,
    pub store_name: String,
    pub store_address: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub items: Vec<ReceiptItem>,
    pub total_amount: f64,
    pub total_method: TotalMethod,
    pub tax_details: Vec<TaxBreakdown>,
    pub discrepancy_detected: bool,
}

impl ParsedReceipt {
    /// Whether the caller should ask the user for the store name
    pub fn needs_store_name(&self) -> bool {
        self.store_name == UNKNOWN_STORE
    }

    /// Sum of all item total prices
    pub fn item_sum(&self) -> f64 {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

/// A stored receipt row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: i64,
    pub vendor: Vendor,
    pub store_name: String,
    pub store_address: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub total_amount: f64,
    pub total_method: TotalMethod,
    pub discrepancy_detected: bool,
    pub tax_details: Vec<TaxBreakdown>,
    /// SHA-256 of the raw OCR text, for deduplication
    pub content_hash: String,
    /// Raw OCR text, kept so re-extraction can re-run the provider chain
    pub ocr_text: Option<String>,
    /// AI re-extraction attempts consumed (max 3)
    pub ai_attempts: i64,
    pub created_at: DateTime<Utc>,
}

/// A stored item row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: i64,
    pub receipt_id: i64,
    #[serde(flatten)]
    pub item: ReceiptItem,
}

/// Where a category mapping came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSource {
    /// Shipped with the application
    Seed,
    /// Added by the user
    User,
    /// Suggested by the AI classifier
    Ai,
}

impl MappingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

impl std::str::FromStr for MappingSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seed" => Ok(Self::Seed),
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            _ => Err(format!("Unknown mapping source: {}", s)),
        }
    }
}

/// A persisted keyword → category association.
///
/// `id` is the SQLite rowid and therefore the insertion order; the resolver
/// uses it as the tie-break for substring matches of equal keyword length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMapping {
    pub id: i64,
    /// Normalized lowercase keyword, unique as an exact-lookup key but
    /// duplicates are permitted in the table
    pub keyword: String,
    pub category: Category,
    pub source: MappingSource,
    pub created_at: DateTime<Utc>,
}

/// A mapping to be inserted (before DB insertion)
#[derive(Debug, Clone, PartialEq)]
pub struct NewMapping {
    pub keyword: String,
    pub category: Category,
    pub source: MappingSource,
}

impl NewMapping {
    /// Normalize the keyword the same way item names are normalized
    pub fn normalized(keyword: &str, category: Category, source: MappingSource) -> Self {
        Self {
            keyword: keyword.trim().to_lowercase(),
            category,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for cat in Category::ALL {
            let parsed: Category = cat.as_str().parse().unwrap();
            assert_eq!(parsed, cat);
        }
    }

    #[test]
    fn test_category_all_is_closed_set() {
        assert_eq!(Category::ALL.len(), 11);
        assert_eq!(Category::ALL.last(), Some(&Category::Other));
    }

    #[test]
    fn test_tax_class_from_percent() {
        assert_eq!(TaxClass::from_percent("19,0"), TaxClass::A);
        assert_eq!(TaxClass::from_percent("7,0"), TaxClass::B);
        assert_eq!(TaxClass::from_percent("7.0"), TaxClass::B);
        assert_eq!(
            TaxClass::from_percent("10,7"),
            TaxClass::Rate("10.7".to_string())
        );
    }

    #[test]
    fn test_tax_class_rate() {
        assert_eq!(TaxClass::A.rate(), Some(0.19));
        assert_eq!(TaxClass::B.rate(), Some(0.07));
        let custom = TaxClass::Rate("10.0".to_string());
        assert!((custom.rate().unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_vendor_round_trip() {
        for vendor in [
            Vendor::Rewe,
            Vendor::Edeka,
            Vendor::Lidl,
            Vendor::Aldi,
            Vendor::Generic,
        ] {
            let parsed: Vendor = vendor.as_str().parse().unwrap();
            assert_eq!(parsed, vendor);
        }
    }

    #[test]
    fn test_new_mapping_normalizes() {
        let mapping = NewMapping::normalized("  Apfel ", Category::Fruits, MappingSource::User);
        assert_eq!(mapping.keyword, "apfel");
    }
}
