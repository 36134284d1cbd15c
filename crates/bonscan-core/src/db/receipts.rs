//! Receipt and item persistence

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    ItemRecord, ParsedReceipt, ReceiptItem, ReceiptRecord, TaxBreakdown, TotalMethod,
};

/// AI re-extraction attempts allowed per receipt
pub const MAX_EXTRACTION_ATTEMPTS: i64 = 3;

impl Database {
    /// Insert a parsed receipt. Items are stored separately via `add_items`.
    ///
    /// The raw OCR text is kept alongside the receipt so a later
    /// re-extraction can feed it to the provider chain again.
    pub fn add_receipt(
        &self,
        receipt: &ParsedReceipt,
        content_hash: &str,
        ocr_text: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        let tax_json = serde_json::to_string(&receipt.tax_details)?;
        conn.execute(
            "INSERT INTO receipts (vendor, store_name, store_address, purchase_date,
             total_amount, total_method, discrepancy, tax_details, content_hash, ocr_text)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                receipt.vendor.as_str(),
                receipt.store_name,
                receipt.store_address,
                receipt.purchase_date.map(|d| d.to_string()),
                receipt.total_amount,
                receipt.total_method.as_str(),
                receipt.discrepancy_detected,
                tax_json,
                content_hash,
                ocr_text,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert items for a receipt in one transaction, preserving order
    pub fn add_items(&self, receipt_id: i64, items: &[ReceiptItem]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO receipt_items (receipt_id, name, category, total_price,
                 quantity, unit_price, tax_class, source)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for item in items {
                stmt.execute(params![
                    receipt_id,
                    item.name,
                    item.category.as_str(),
                    item.total_price,
                    item.quantity,
                    item.unit_price,
                    item.tax_class.as_ref().map(|t| t.code().to_string()),
                    item.source.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Get a receipt by ID
    pub fn get_receipt(&self, id: i64) -> Result<Option<ReceiptRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, vendor, store_name, store_address, purchase_date, total_amount,
                    total_method, discrepancy, tax_details, content_hash, ocr_text,
                    ai_attempts, created_at
             FROM receipts WHERE id = ?",
        )?;

        let receipt = stmt
            .query_row(params![id], Self::row_to_receipt)
            .optional()?;

        Ok(receipt)
    }

    /// Get a receipt by content hash (for deduplication)
    pub fn get_receipt_by_hash(&self, content_hash: &str) -> Result<Option<ReceiptRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, vendor, store_name, store_address, purchase_date, total_amount,
                    total_method, discrepancy, tax_details, content_hash, ocr_text,
                    ai_attempts, created_at
             FROM receipts WHERE content_hash = ?",
        )?;

        let receipt = stmt
            .query_row(params![content_hash], Self::row_to_receipt)
            .optional()?;

        Ok(receipt)
    }

    /// List receipts, newest first
    pub fn list_receipts(&self, limit: i64) -> Result<Vec<ReceiptRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, vendor, store_name, store_address, purchase_date, total_amount,
                    total_method, discrepancy, tax_details, content_hash, ocr_text,
                    ai_attempts, created_at
             FROM receipts ORDER BY created_at DESC, id DESC LIMIT ?",
        )?;

        let receipts = stmt
            .query_map(params![limit], Self::row_to_receipt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(receipts)
    }

    /// Items of a receipt, in insertion order
    pub fn get_items(&self, receipt_id: i64) -> Result<Vec<ItemRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, receipt_id, name, category, total_price, quantity, unit_price,
                    tax_class, source
             FROM receipt_items WHERE receipt_id = ? ORDER BY id ASC",
        )?;

        let items = stmt
            .query_map(params![receipt_id], |row| {
                let category: String = row.get(3)?;
                let tax_class: Option<String> = row.get(7)?;
                let source: String = row.get(8)?;
                Ok(ItemRecord {
                    id: row.get(0)?,
                    receipt_id: row.get(1)?,
                    item: ReceiptItem {
                        name: row.get(2)?,
                        category: category.parse().unwrap_or(crate::models::Category::Other),
                        total_price: row.get(4)?,
                        quantity: row.get(5)?,
                        unit_price: row.get(6)?,
                        tax_class: tax_class.and_then(|t| t.parse().ok()),
                        source: source.parse().unwrap_or_default(),
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Delete a receipt (items cascade). Used to roll back failed scans so
    /// no orphaned partial data remains.
    pub fn delete_receipt(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM receipts WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Update the total and discrepancy flag after supplementary items
    pub fn update_reconciliation(
        &self,
        id: i64,
        total_amount: f64,
        discrepancy: bool,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE receipts SET total_amount = ?, discrepancy = ? WHERE id = ?",
            params![total_amount, discrepancy, id],
        )?;
        Ok(())
    }

    /// Set the store name after manual entry
    pub fn update_store_name(&self, id: i64, store_name: &str) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE receipts SET store_name = ? WHERE id = ?",
            params![store_name, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("receipt {}", id)));
        }
        Ok(())
    }

    /// Consume one AI extraction attempt; fails once the budget is spent.
    ///
    /// Returns the new attempt count.
    pub fn record_extraction_attempt(&self, id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let attempts: i64 = conn
            .query_row(
                "SELECT ai_attempts FROM receipts WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("receipt {}", id)))?;

        if attempts >= MAX_EXTRACTION_ATTEMPTS {
            return Err(Error::AttemptsExhausted {
                receipt_id: id,
                attempts,
                max: MAX_EXTRACTION_ATTEMPTS,
            });
        }

        conn.execute(
            "UPDATE receipts SET ai_attempts = ai_attempts + 1 WHERE id = ?",
            params![id],
        )?;
        Ok(attempts + 1)
    }

    fn row_to_receipt(row: &rusqlite::Row) -> rusqlite::Result<ReceiptRecord> {
        let vendor: String = row.get(1)?;
        let purchase_date: Option<String> = row.get(4)?;
        let total_method: String = row.get(6)?;
        let tax_json: Option<String> = row.get(8)?;
        let created_at: String = row.get(12)?;

        let tax_details: Vec<TaxBreakdown> = tax_json
            .and_then(|j| serde_json::from_str(&j).ok())
            .unwrap_or_default();

        Ok(ReceiptRecord {
            id: row.get(0)?,
            vendor: vendor.parse().unwrap_or(crate::models::Vendor::Generic),
            store_name: row.get(2)?,
            store_address: row.get(3)?,
            purchase_date: purchase_date
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            total_amount: row.get(5)?,
            total_method: total_method.parse().unwrap_or(TotalMethod::Explicit),
            discrepancy_detected: row.get(7)?,
            tax_details,
            content_hash: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            ocr_text: row.get(10)?,
            ai_attempts: row.get(11)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
