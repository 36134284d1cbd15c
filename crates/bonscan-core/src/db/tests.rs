//! Database layer tests

use chrono::NaiveDate;

use super::receipts::MAX_EXTRACTION_ATTEMPTS;
use super::Database;
use crate::error::Error;
use crate::models::{
    Category, ItemSource, MappingSource, NewMapping, ParsedReceipt, ReceiptItem, TaxBreakdown,
    TaxClass, TotalMethod, Vendor,
};

fn sample_receipt() -> ParsedReceipt {
    ParsedReceipt {
        vendor: Vendor::Rewe,
        store_name: "REWE Markt GmbH".to_string(),
        store_address: Some("Hauptstr. 5, 12345 Musterstadt".to_string()),
        purchase_date: NaiveDate::from_ymd_opt(2024, 3, 14),
        items: vec![
            ReceiptItem {
                name: "BIO BANANEN".to_string(),
                category: Category::Fruits,
                total_price: 1.99,
                quantity: None,
                unit_price: None,
                tax_class: Some(TaxClass::B),
                source: ItemSource::Parser,
            },
            ReceiptItem {
                name: "MILCH 1,5%".to_string(),
                category: Category::Dairy,
                total_price: 1.09,
                quantity: None,
                unit_price: None,
                tax_class: Some(TaxClass::B),
                source: ItemSource::Parser,
            },
        ],
        total_amount: 3.08,
        total_method: TotalMethod::Explicit,
        tax_details: vec![TaxBreakdown {
            class: TaxClass::B,
            net: 2.88,
            tax: 0.20,
            gross: 3.08,
        }],
        discrepancy_detected: false,
    }
}

#[test]
fn test_receipt_round_trip() {
    let db = Database::in_memory().unwrap();
    let receipt = sample_receipt();

    let id = db.add_receipt(&receipt, "hash-1", "OCR TEXT").unwrap();
    db.add_items(id, &receipt.items).unwrap();

    let stored = db.get_receipt(id).unwrap().unwrap();
    assert_eq!(stored.store_name, "REWE Markt GmbH");
    assert_eq!(stored.total_amount, 3.08);
    assert_eq!(stored.total_method, TotalMethod::Explicit);
    assert_eq!(stored.vendor, Vendor::Rewe);
    assert_eq!(stored.purchase_date, NaiveDate::from_ymd_opt(2024, 3, 14));
    assert!(!stored.discrepancy_detected);
    assert_eq!(stored.tax_details.len(), 1);
    assert_eq!(stored.tax_details[0].class, TaxClass::B);
    assert_eq!(stored.ocr_text.as_deref(), Some("OCR TEXT"));
    assert_eq!(stored.ai_attempts, 0);

    // Items come back in order with categories intact.
    let items = db.get_items(id).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].item.name, "BIO BANANEN");
    assert_eq!(items[0].item.category, Category::Fruits);
    assert_eq!(items[1].item.category, Category::Dairy);
    assert_eq!(items[1].item.tax_class, Some(TaxClass::B));
}

#[test]
fn test_receipt_lookup_by_hash() {
    let db = Database::in_memory().unwrap();
    let receipt = sample_receipt();

    let id = db.add_receipt(&receipt, "hash-dedup", "OCR TEXT").unwrap();
    let found = db.get_receipt_by_hash("hash-dedup").unwrap().unwrap();
    assert_eq!(found.id, id);

    assert!(db.get_receipt_by_hash("other-hash").unwrap().is_none());
}

#[test]
fn test_duplicate_hash_rejected_by_unique_constraint() {
    let db = Database::in_memory().unwrap();
    let receipt = sample_receipt();

    db.add_receipt(&receipt, "hash-same", "OCR TEXT").unwrap();
    assert!(db.add_receipt(&receipt, "hash-same", "OCR TEXT").is_err());
}

#[test]
fn test_delete_receipt_cascades_items() {
    let db = Database::in_memory().unwrap();
    let receipt = sample_receipt();

    let id = db.add_receipt(&receipt, "hash-del", "OCR TEXT").unwrap();
    db.add_items(id, &receipt.items).unwrap();

    assert!(db.delete_receipt(id).unwrap());
    assert!(db.get_receipt(id).unwrap().is_none());
    assert!(db.get_items(id).unwrap().is_empty());

    // Deleting again is a no-op.
    assert!(!db.delete_receipt(id).unwrap());
}

#[test]
fn test_extraction_attempt_budget() {
    let db = Database::in_memory().unwrap();
    let id = db.add_receipt(&sample_receipt(), "hash-att", "OCR TEXT").unwrap();

    for expected in 1..=MAX_EXTRACTION_ATTEMPTS {
        assert_eq!(db.record_extraction_attempt(id).unwrap(), expected);
    }

    let err = db.record_extraction_attempt(id).unwrap_err();
    assert!(matches!(err, Error::AttemptsExhausted { .. }));
}

#[test]
fn test_update_reconciliation() {
    let db = Database::in_memory().unwrap();
    let id = db.add_receipt(&sample_receipt(), "hash-rec", "OCR TEXT").unwrap();

    db.update_reconciliation(id, 4.50, true).unwrap();
    let stored = db.get_receipt(id).unwrap().unwrap();
    assert_eq!(stored.total_amount, 4.50);
    assert!(stored.discrepancy_detected);
}

#[test]
fn test_update_store_name() {
    let db = Database::in_memory().unwrap();
    let id = db.add_receipt(&sample_receipt(), "hash-store", "OCR TEXT").unwrap();

    db.update_store_name(id, "Dorfladen Huber").unwrap();
    let stored = db.get_receipt(id).unwrap().unwrap();
    assert_eq!(stored.store_name, "Dorfladen Huber");

    assert!(matches!(
        db.update_store_name(9999, "x").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_mappings_preserve_insertion_order() {
    let db = Database::in_memory().unwrap();

    db.insert_mappings(&[
        NewMapping::normalized("Apfel", Category::Fruits, MappingSource::User),
        NewMapping::normalized("apfelsaft", Category::Beverages, MappingSource::User),
        NewMapping::normalized("saft", Category::Beverages, MappingSource::Ai),
    ])
    .unwrap();

    let mappings = db.all_mappings().unwrap();
    assert_eq!(mappings.len(), 3);
    assert_eq!(mappings[0].keyword, "apfel");
    assert_eq!(mappings[1].keyword, "apfelsaft");
    assert_eq!(mappings[2].keyword, "saft");
    assert!(mappings[0].id < mappings[1].id);
    assert!(mappings[1].id < mappings[2].id);
}

#[test]
fn test_duplicate_keywords_allowed() {
    let db = Database::in_memory().unwrap();

    db.insert_mappings(&[
        NewMapping::normalized("tofu", Category::Other, MappingSource::Ai),
        NewMapping::normalized("tofu", Category::Meat, MappingSource::Ai),
    ])
    .unwrap();

    assert_eq!(db.mapping_count().unwrap(), 2);

    // Exact lookup returns the earliest-inserted row.
    let hit = db.lookup_keyword("tofu").unwrap().unwrap();
    assert_eq!(hit.category, Category::Other);
}

#[test]
fn test_lookup_keyword_normalizes_input() {
    let db = Database::in_memory().unwrap();
    db.insert_mappings(&[NewMapping::normalized(
        "milch",
        Category::Dairy,
        MappingSource::Seed,
    )])
    .unwrap();

    let hit = db.lookup_keyword("  MILCH ").unwrap().unwrap();
    assert_eq!(hit.category, Category::Dairy);
}

#[test]
fn test_seed_runs_once() {
    let db = Database::in_memory().unwrap();

    let first = db.seed_default_mappings().unwrap();
    assert!(first > 0);

    let second = db.seed_default_mappings().unwrap();
    assert_eq!(second, 0);
    assert_eq!(db.mapping_count().unwrap(), first as i64);
}

#[test]
fn test_category_counts() {
    let db = Database::in_memory().unwrap();

    db.increment_category_count(Category::Dairy).unwrap();
    db.increment_category_count(Category::Dairy).unwrap();
    db.increment_category_count(Category::Fruits).unwrap();

    let counts = db.category_counts().unwrap();
    assert_eq!(counts[0], (Category::Dairy, 2));
    assert_eq!(counts[1], (Category::Fruits, 1));
}
