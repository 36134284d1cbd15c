//! Tolerant parsing of provider response bodies
//!
//! Models answer in one of two recognized shapes: a pipe-delimited markdown
//! table (`Name | Category | Price`) or a JSON object (`{"items":[...]}`).
//! The body is first classified into a typed shape, then validated row by
//! row. An unrecognizable body yields zero items; only the provider call
//! itself failing is an error, and that is the chain's concern.

use tracing::debug;

use crate::models::Category;
use crate::money::{parse_price, parse_quantity, round2};

use super::types::{ExtractedItem, KeywordSuggestion};

/// Recognized response body shapes
enum ResponseBody {
    /// A JSON object somewhere in the response text
    Json(serde_json::Value),
    /// Pipe-delimited table rows (header and rule rows already removed)
    Table(Vec<Vec<String>>),
    /// Neither shape found
    Unrecognized,
}

/// Classify a response body into one of the known shapes
fn classify_body(response: &str) -> ResponseBody {
    let trimmed = response.trim();

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&trimmed[start..=end]) {
                return ResponseBody::Json(value);
            }
        }
    }

    let rows = table_rows(trimmed);
    if !rows.is_empty() {
        return ResponseBody::Table(rows);
    }

    ResponseBody::Unrecognized
}

/// Extract data rows from markdown-table formatted text
fn table_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| line.contains('|'))
        .map(|line| {
            line.trim()
                .trim_matches('|')
                .split('|')
                .map(|cell| cell.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.len() >= 2 && !is_header_or_rule(cells))
        .collect()
}

fn is_header_or_rule(cells: &[String]) -> bool {
    // Separator rows are all dashes/colons; header rows name the columns.
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
        || cells
            .iter()
            .any(|c| c.eq_ignore_ascii_case("name") || c.eq_ignore_ascii_case("keyword"))
}

/// Parse an extraction response into validated items.
///
/// Each item must have a non-empty name and a price in (0, 1000); rows
/// failing validation are dropped.
pub fn parse_extraction_response(response: &str) -> Vec<ExtractedItem> {
    let candidates: Vec<ExtractedItem> = match classify_body(response) {
        ResponseBody::Json(value) => value
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(json_item).collect())
            .unwrap_or_default(),
        ResponseBody::Table(rows) => rows.iter().filter_map(|r| table_item(r)).collect(),
        ResponseBody::Unrecognized => {
            debug!(
                len = response.len(),
                "unrecognized extraction response body, treating as zero items"
            );
            Vec::new()
        }
    };

    candidates
        .into_iter()
        .filter(|item| !item.name.is_empty() && item.price > 0.0 && item.price < 1000.0)
        .collect()
}

fn json_item(value: &serde_json::Value) -> Option<ExtractedItem> {
    let name = value.get("name")?.as_str()?.trim().to_string();
    let price = json_price(value.get("price")?)?;
    let category = value
        .get("category")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let quantity = value.get("quantity").and_then(json_quantity);

    Some(ExtractedItem {
        name,
        category,
        price,
        quantity,
    })
}

/// Prices may arrive as JSON numbers or as locale-formatted strings
fn json_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(round2),
        serde_json::Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn json_quantity(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|q| *q > 0.0),
        serde_json::Value::String(s) => parse_quantity(s),
        _ => None,
    }
}

fn table_item(cells: &[String]) -> Option<ExtractedItem> {
    let (name, category, price_cell) = match cells.len() {
        0 | 1 => return None,
        2 => (cells[0].clone(), None, &cells[1]),
        _ => (
            cells[0].clone(),
            Some(cells[1].clone()).filter(|c| !c.is_empty()),
            &cells[2],
        ),
    };

    let price = parse_price(price_cell)?;
    let name = name.trim().to_string();

    Some(ExtractedItem {
        name,
        category,
        price,
        quantity: None,
    })
}

/// Parse a classification response into keyword suggestions.
///
/// Accepts `{"mappings":[{"keyword","category"}]}` JSON or a
/// `Keyword | Category` table. Pairs with an empty keyword or a category
/// outside the closed set are dropped.
pub fn parse_classification_response(response: &str) -> Vec<KeywordSuggestion> {
    let pairs: Vec<(String, String)> = match classify_body(response) {
        ResponseBody::Json(value) => value
            .get("mappings")
            .or_else(|| value.get("keywords"))
            .and_then(|v| v.as_array())
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| {
                        let keyword = row.get("keyword")?.as_str()?.to_string();
                        let category = row.get("category")?.as_str()?.to_string();
                        Some((keyword, category))
                    })
                    .collect()
            })
            .unwrap_or_default(),
        ResponseBody::Table(rows) => rows
            .into_iter()
            .filter(|cells| cells.len() >= 2)
            .map(|cells| (cells[0].clone(), cells[1].clone()))
            .collect(),
        ResponseBody::Unrecognized => {
            debug!("unrecognized classification response body");
            Vec::new()
        }
    };

    pairs
        .into_iter()
        .filter_map(|(keyword, category)| {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return None;
            }
            let category: Category = match category.parse() {
                Ok(c) => c,
                Err(_) => {
                    debug!(
                        keyword = keyword.as_str(),
                        category = category.as_str(),
                        "dropping suggestion with unknown category"
                    );
                    return None;
                }
            };
            Some(KeywordSuggestion { keyword, category })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_items() {
        let response = r#"{"items":[
            {"name":"Milch","category":"Dairy","price":1.29},
            {"name":"Brot","price":"2,19","quantity":1}
        ]}"#;

        let items = parse_extraction_response(response);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Milch");
        assert_eq!(items[0].category.as_deref(), Some("Dairy"));
        assert_eq!(items[0].price, 1.29);
        // Locale-formatted string prices are normalized.
        assert_eq!(items[1].price, 2.19);
        assert_eq!(items[1].quantity, Some(1.0));
    }

    #[test]
    fn test_parse_json_with_surrounding_text() {
        let response = r#"Here is what I found:
{"items":[{"name":"Butter","price":2.49}]}
Let me know if you need anything else."#;

        let items = parse_extraction_response(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Butter");
    }

    #[test]
    fn test_parse_markdown_table() {
        let response = "\
| Name | Category | Price |
|------|----------|-------|
| Milch | Dairy | 1.29 |
| Apfelsaft | Beverages | 2,49 |
";
        let items = parse_extraction_response(response);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Milch");
        assert_eq!(items[0].category.as_deref(), Some("Dairy"));
        assert_eq!(items[1].name, "Apfelsaft");
        assert_eq!(items[1].price, 2.49);
    }

    #[test]
    fn test_table_without_outer_pipes() {
        let response = "Name | Category | Price\nKaese | Dairy | 3,99";
        let items = parse_extraction_response(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Kaese");
    }

    #[test]
    fn test_unparseable_body_yields_zero_items() {
        assert!(parse_extraction_response("I could not read the receipt.").is_empty());
        assert!(parse_extraction_response("").is_empty());
    }

    #[test]
    fn test_items_failing_validation_are_dropped() {
        let response = r#"{"items":[
            {"name":"","price":1.00},
            {"name":"Ok","price":0.0},
            {"name":"Too much","price":1500.0},
            {"name":"Fine","price":3.49}
        ]}"#;

        let items = parse_extraction_response(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Fine");
    }

    #[test]
    fn test_malformed_json_rows_are_skipped() {
        let response = r#"{"items":[{"name":"NoPrice"},{"name":"Good","price":1.10}]}"#;
        let items = parse_extraction_response(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Good");
    }

    #[test]
    fn test_parse_classification_json() {
        let response = r#"{"mappings":[
            {"keyword":"Vollmilch","category":"Dairy"},
            {"keyword":"","category":"Dairy"},
            {"keyword":"Raetsel","category":"Nonsense"}
        ]}"#;

        let suggestions = parse_classification_response(response);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].keyword, "vollmilch");
        assert_eq!(suggestions[0].category, Category::Dairy);
    }

    #[test]
    fn test_parse_classification_table() {
        let response = "\
| Keyword | Category |
|---------|----------|
| gouda | Dairy |
| apfelschorle | Beverages |
";
        let suggestions = parse_classification_response(response);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].keyword, "gouda");
        assert_eq!(suggestions[1].category, Category::Beverages);
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        let response = r#"{"mappings":[{"keyword":"senf","category":"other"}]}"#;
        let suggestions = parse_classification_response(response);
        assert_eq!(suggestions[0].category, Category::Other);
    }
}
