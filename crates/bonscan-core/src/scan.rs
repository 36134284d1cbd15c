//! Scan pipeline
//!
//! Composition root for a single OCR scan: vendor detection, parsing,
//! reconciliation, category resolution, persistence, and the AI
//! re-extraction path on discrepancy. The database and provider chain are
//! injected by the caller and passed by reference; the pipeline itself
//! holds no state between scans.

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::ai::{ChainResult, ExtractedItem, ProviderChain};
use crate::categorize::{self, CategoryResolver};
use crate::db::Database;
use crate::error::{Error, ProviderFailure, Result};
use crate::models::{Category, ItemSource, ParsedReceipt, ReceiptItem};
use crate::{parse, reconcile};

/// Result of one pipeline run
#[derive(Debug)]
pub struct ScanReport {
    pub receipt_id: i64,
    /// The receipt as persisted, including any AI-supplemented items
    pub receipt: ParsedReceipt,
    /// The store could not be identified; ask the user for a name
    pub needs_store_name: bool,
    /// Whether the AI chain contributed supplementary items
    pub ai_supplemented: bool,
    /// Provider failures recorded during the AI path (empty when the first
    /// provider answered or the chain never ran)
    pub ai_failures: Vec<ProviderFailure>,
}

/// Scan pipeline with injected collaborators
pub struct ScanPipeline<'a> {
    db: &'a Database,
    chain: Option<&'a ProviderChain>,
}

impl<'a> ScanPipeline<'a> {
    pub fn new(db: &'a Database, chain: Option<&'a ProviderChain>) -> Self {
        Self { db, chain }
    }

    /// Process one OCR text end to end.
    ///
    /// On a parse validation failure nothing is persisted. If item
    /// persistence fails after the receipt row was created, the receipt is
    /// deleted again so no orphaned partial data remains. A discrepancy
    /// triggers the AI extraction chain (when configured); chain exhaustion
    /// is reported in the result rather than failing the scan.
    pub async fn scan(
        &self,
        ocr_text: &str,
        store_name_override: Option<&str>,
    ) -> Result<ScanReport> {
        let content_hash = hash_text(ocr_text);
        if let Some(existing) = self.db.get_receipt_by_hash(&content_hash)? {
            return Err(Error::Duplicate(format!(
                "identical text already scanned as receipt {}",
                existing.id
            )));
        }

        let mut receipt = parse::parse_receipt(ocr_text)?;
        if let Some(name) = store_name_override {
            receipt.store_name = name.to_string();
        }

        let resolver = CategoryResolver::load(self.db)?;
        resolver.categorize_items(&mut receipt.items);

        let receipt_id = self.db.add_receipt(&receipt, &content_hash, ocr_text)?;
        if let Err(e) = self.db.add_items(receipt_id, &receipt.items) {
            let _ = self.db.delete_receipt(receipt_id);
            return Err(e);
        }
        for item in &receipt.items {
            self.db.increment_category_count(item.category)?;
        }

        info!(
            receipt_id,
            vendor = %receipt.vendor,
            items = receipt.items.len(),
            total = receipt.total_amount,
            discrepancy = receipt.discrepancy_detected,
            "receipt scanned"
        );

        let mut ai_supplemented = false;
        let mut ai_failures = Vec::new();

        if receipt.discrepancy_detected {
            if let Some(chain) = self.chain {
                match self
                    .supplement(receipt_id, &mut receipt, &resolver, chain, ocr_text)
                    .await
                {
                    Ok(failures) => {
                        ai_supplemented = true;
                        ai_failures = failures;
                    }
                    Err(Error::ProviderChain(failures)) => {
                        // One consolidated warning; the scan itself stands.
                        warn!(
                            receipt_id,
                            providers = failures.len(),
                            "all providers failed during supplementary extraction"
                        );
                        ai_failures = failures;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(ScanReport {
            receipt_id,
            needs_store_name: receipt.needs_store_name(),
            receipt,
            ai_supplemented,
            ai_failures,
        })
    }

    /// User-triggered AI re-extraction for a stored receipt.
    ///
    /// Consumes one attempt from the receipt's budget (3 per receipt);
    /// past the budget this fails with the terminal `AttemptsExhausted`
    /// error. Chain exhaustion propagates as the aggregate provider error.
    pub async fn reextract(&self, receipt_id: i64) -> Result<ScanReport> {
        let chain = self
            .chain
            .ok_or_else(|| Error::InvalidData("no providers configured".into()))?;

        let record = self
            .db
            .get_receipt(receipt_id)?
            .ok_or_else(|| Error::NotFound(format!("receipt {}", receipt_id)))?;
        let ocr_text = record
            .ocr_text
            .clone()
            .ok_or_else(|| Error::NotFound(format!("stored OCR text for receipt {}", receipt_id)))?;

        let items = self.db.get_items(receipt_id)?;
        let mut receipt = ParsedReceipt {
            vendor: record.vendor,
            store_name: record.store_name,
            store_address: record.store_address,
            purchase_date: record.purchase_date,
            items: items.into_iter().map(|r| r.item).collect(),
            total_amount: record.total_amount,
            total_method: record.total_method,
            tax_details: record.tax_details,
            discrepancy_detected: record.discrepancy_detected,
        };

        let resolver = CategoryResolver::load(self.db)?;
        let failures = self
            .supplement(receipt_id, &mut receipt, &resolver, chain, &ocr_text)
            .await?;

        Ok(ScanReport {
            receipt_id,
            needs_store_name: receipt.needs_store_name(),
            receipt,
            ai_supplemented: true,
            ai_failures: failures,
        })
    }

    /// Classify free-text product descriptions and append the suggested
    /// mappings to the store. Returns the number of mappings learned.
    pub async fn learn_from_text(&self, text: &str) -> Result<usize> {
        let chain = self
            .chain
            .ok_or_else(|| Error::InvalidData("no providers configured".into()))?;

        let result = chain.classify_products(text).await?;
        let learned = categorize::learn_mappings(self.db, &result.value)?;
        info!(
            provider = result.provider.as_str(),
            learned, "keyword mappings learned"
        );
        Ok(learned)
    }

    /// Run the extraction chain and merge genuinely new items into the
    /// receipt, then recompute the discrepancy flag.
    async fn supplement(
        &self,
        receipt_id: i64,
        receipt: &mut ParsedReceipt,
        resolver: &CategoryResolver,
        chain: &ProviderChain,
        ocr_text: &str,
    ) -> Result<Vec<ProviderFailure>> {
        // Every invocation consumes one attempt, successful or not; the
        // budget is what makes "give up" terminal.
        let attempt = self.db.record_extraction_attempt(receipt_id)?;
        info!(receipt_id, attempt, "running AI extraction chain");

        let result: ChainResult<Vec<ExtractedItem>> = chain.extract_items(ocr_text).await?;

        let new_items = merge_items(receipt, result.value, resolver);
        if !new_items.is_empty() {
            self.db.add_items(receipt_id, &new_items)?;
            for item in &new_items {
                self.db.increment_category_count(item.category)?;
            }
            receipt.items.extend(new_items);
            reconcile::recompute(receipt);
            self.db.update_reconciliation(
                receipt_id,
                receipt.total_amount,
                receipt.discrepancy_detected,
            )?;
        }

        info!(
            receipt_id,
            provider = result.provider.as_str(),
            discrepancy = receipt.discrepancy_detected,
            "supplementary extraction merged"
        );
        Ok(result.failures)
    }
}

/// Keep only extracted items whose names the parser did not already find,
/// and run each through the resolution engine. The provider's category is
/// used only when the engine has no opinion (resolves to Other).
fn merge_items(
    receipt: &ParsedReceipt,
    extracted: Vec<ExtractedItem>,
    resolver: &CategoryResolver,
) -> Vec<ReceiptItem> {
    let mut new_items = Vec::new();

    for item in extracted {
        let name_lower = item.name.to_lowercase();
        if receipt
            .items
            .iter()
            .any(|existing| existing.name.to_lowercase() == name_lower)
        {
            continue;
        }

        let mut category = resolver.resolve(&item.name);
        if category == Category::Other {
            if let Some(hint) = item
                .category
                .as_deref()
                .and_then(|h| h.parse::<Category>().ok())
            {
                category = hint;
            }
        }

        new_items.push(ReceiptItem {
            name: item.name,
            category,
            total_price: item.price,
            quantity: item.quantity,
            unit_price: None,
            tax_class: None,
            source: ItemSource::Ai,
        });
    }

    new_items
}

/// SHA-256 of the raw OCR text, used as the receipt's dedup key
pub fn hash_text(ocr_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ocr_text.as_bytes());
    hex::encode(hasher.finalize())
}
