//! Total reconciliation
//!
//! Cross-checks the parser-extracted grand total against the sum of item
//! prices and flags a discrepancy when they diverge beyond tolerance. A
//! discrepancy is a flag on the result, not an error; it prompts the
//! optional AI re-extraction path in the scan pipeline.

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ParsedReceipt, ReceiptItem, TotalMethod};
use crate::money::round2;

/// Absolute tolerance between declared total and item sum, in currency units
pub const TOLERANCE: f64 = 0.01;

/// Outcome of reconciling a declared total against extracted items
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub total_amount: f64,
    pub total_method: TotalMethod,
    pub discrepancy_detected: bool,
}

/// Reconcile the declared total (if any) against the item sum.
///
/// With no declared total the computed sum becomes the total and the method
/// is tagged `Calculated`. Zero items and no total is a hard validation
/// failure, not a zero-value receipt.
pub fn reconcile(declared: Option<f64>, items: &[ReceiptItem]) -> Result<Reconciliation> {
    let sum = round2(items.iter().map(|i| i.total_price).sum());

    match declared {
        Some(total) => {
            let diff = (total - sum).abs();
            let discrepancy = diff > TOLERANCE;
            if discrepancy {
                debug!(
                    declared = total,
                    item_sum = sum,
                    diff,
                    "total discrepancy detected"
                );
            }
            Ok(Reconciliation {
                total_amount: total,
                total_method: TotalMethod::Explicit,
                discrepancy_detected: discrepancy,
            })
        }
        None if items.is_empty() => Err(Error::Validation(
            "receipt has no items and no total".to_string(),
        )),
        None => Ok(Reconciliation {
            total_amount: sum,
            total_method: TotalMethod::Calculated,
            discrepancy_detected: false,
        }),
    }
}

/// Re-derive the discrepancy flag after supplementary items were appended.
///
/// A calculated total tracks the item sum, so it can never diverge; an
/// explicit total is compared against the new sum.
pub fn recompute(receipt: &mut ParsedReceipt) {
    let sum = round2(receipt.item_sum());
    match receipt.total_method {
        TotalMethod::Explicit => {
            receipt.discrepancy_detected = (receipt.total_amount - sum).abs() > TOLERANCE;
        }
        TotalMethod::Calculated => {
            receipt.total_amount = sum;
            receipt.discrepancy_detected = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ItemSource, Vendor};

    fn item(price: f64) -> ReceiptItem {
        ReceiptItem {
            name: "test".to_string(),
            category: Category::Other,
            total_price: price,
            quantity: None,
            unit_price: None,
            tax_class: None,
            source: ItemSource::Parser,
        }
    }

    #[test]
    fn test_matching_total_within_tolerance() {
        let items = vec![item(1.99), item(2.50), item(0.99)];
        let result = reconcile(Some(5.48), &items).unwrap();
        assert!(!result.discrepancy_detected);
        assert_eq!(result.total_amount, 5.48);
        assert_eq!(result.total_method, TotalMethod::Explicit);
    }

    #[test]
    fn test_diverging_total_flags_discrepancy() {
        let items = vec![item(1.99), item(2.50), item(0.99)];
        let result = reconcile(Some(6.00), &items).unwrap();
        assert!(result.discrepancy_detected);
        // The declared total is kept; the flag carries the information.
        assert_eq!(result.total_amount, 6.00);
    }

    #[test]
    fn test_missing_total_falls_back_to_sum() {
        let items = vec![item(1.10), item(2.20)];
        let result = reconcile(None, &items).unwrap();
        assert_eq!(result.total_amount, 3.30);
        assert_eq!(result.total_method, TotalMethod::Calculated);
        assert!(!result.discrepancy_detected);
    }

    #[test]
    fn test_no_items_no_total_is_hard_failure() {
        let err = reconcile(None, &[]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_recompute_after_supplementary_items() {
        let mut receipt = ParsedReceipt {
            vendor: Vendor::Generic,
            store_name: "Test".to_string(),
            store_address: None,
            purchase_date: None,
            items: vec![item(2.00)],
            total_amount: 5.00,
            total_method: TotalMethod::Explicit,
            tax_details: vec![],
            discrepancy_detected: true,
        };

        receipt.items.push(item(3.00));
        recompute(&mut receipt);
        assert!(!receipt.discrepancy_detected);

        receipt.items.push(item(0.50));
        recompute(&mut receipt);
        assert!(receipt.discrepancy_detected);
    }

    #[test]
    fn test_recompute_calculated_tracks_sum() {
        let mut receipt = ParsedReceipt {
            vendor: Vendor::Generic,
            store_name: "Test".to_string(),
            store_address: None,
            purchase_date: None,
            items: vec![item(2.00)],
            total_amount: 2.00,
            total_method: TotalMethod::Calculated,
            tax_details: vec![],
            discrepancy_detected: false,
        };

        receipt.items.push(item(1.25));
        recompute(&mut receipt);
        assert_eq!(receipt.total_amount, 3.25);
        assert!(!receipt.discrepancy_detected);
    }
}
