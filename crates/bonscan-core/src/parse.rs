//! Vendor receipt parsers for OCR'd supermarket text
//!
//! Each vendor gets its own grammar (summary marker, address heuristics),
//! sharing one line-walking skeleton: item-scanning mode until the summary
//! marker, then metadata-scanning mode for the grand total, tax table and
//! purchase date. Unparseable item lines are dropped and parsing continues;
//! a receipt without a single valid item fails with a validation error.

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{
    Category, ItemSource, ParsedReceipt, ReceiptItem, TaxBreakdown, TaxClass, Vendor,
    UNKNOWN_STORE,
};
use crate::money::{parse_price, parse_quantity};
use crate::reconcile;

/// Per-vendor grammar parameters
struct VendorProfile {
    vendor: Vendor,
    /// Lowercase substrings that switch the scanner into metadata mode
    summary_markers: &'static [&'static str],
}

const REWE_PROFILE: VendorProfile = VendorProfile {
    vendor: Vendor::Rewe,
    summary_markers: &["summe"],
};

const EDEKA_PROFILE: VendorProfile = VendorProfile {
    vendor: Vendor::Edeka,
    summary_markers: &["summe"],
};

const LIDL_PROFILE: VendorProfile = VendorProfile {
    vendor: Vendor::Lidl,
    summary_markers: &["zu zahlen", "summe"],
};

const ALDI_PROFILE: VendorProfile = VendorProfile {
    vendor: Vendor::Aldi,
    summary_markers: &["summe"],
};

const GENERIC_PROFILE: VendorProfile = VendorProfile {
    vendor: Vendor::Generic,
    summary_markers: &["summe", "zu zahlen", "total", "gesamt"],
};

/// Detect the vendor from OCR text via case-insensitive signature substrings.
///
/// Vendor-specific signatures are checked in fixed priority order before
/// falling back to the generic grammar.
pub fn detect_vendor(ocr_text: &str) -> Vendor {
    let haystack = ocr_text.to_lowercase();
    if haystack.contains("rewe") {
        return Vendor::Rewe;
    }
    if haystack.contains("edeka") {
        return Vendor::Edeka;
    }
    if haystack.contains("lidl") {
        return Vendor::Lidl;
    }
    if haystack.contains("aldi") {
        return Vendor::Aldi;
    }
    Vendor::Generic
}

/// Parse one OCR text into a structured receipt.
///
/// Pure: the same input always yields the same output. Items come back with
/// `Category::Other`; category resolution is a separate pass.
pub fn parse_receipt(ocr_text: &str) -> Result<ParsedReceipt> {
    parse_with_vendor(ocr_text, detect_vendor(ocr_text))
}

/// Parse with a known vendor (skips detection)
pub fn parse_with_vendor(ocr_text: &str, vendor: Vendor) -> Result<ParsedReceipt> {
    match vendor {
        Vendor::Rewe => parse_rewe(ocr_text),
        Vendor::Edeka => parse_edeka(ocr_text),
        Vendor::Lidl => parse_lidl(ocr_text),
        Vendor::Aldi => parse_aldi(ocr_text),
        Vendor::Generic => parse_generic(ocr_text),
    }
}

/// Parse a REWE receipt.
///
/// Banner line carries the store name; the two lines after it are street
/// and city. Summary marker is "SUMME".
fn parse_rewe(ocr_text: &str) -> Result<ParsedReceipt> {
    let lines = non_empty_lines(ocr_text);
    let scan = scan_body(&lines, &REWE_PROFILE)?;

    let banner = find_banner(&lines, "rewe");
    let store_name = banner
        .map(|i| lines[i].to_string())
        .unwrap_or_else(|| UNKNOWN_STORE.to_string());
    let store_address = banner.and_then(|i| address_after(&lines, i, 2));

    finish(Vendor::Rewe, store_name, store_address, scan)
}

/// Parse an EDEKA receipt.
///
/// The market name is the first printed line; the address is everything
/// between it and the "Tel." line. Summary marker is "Summe".
fn parse_edeka(ocr_text: &str) -> Result<ParsedReceipt> {
    let lines = non_empty_lines(ocr_text);
    let scan = scan_body(&lines, &EDEKA_PROFILE)?;

    let tel_idx = lines
        .iter()
        .position(|l| l.to_lowercase().starts_with("tel"));
    let (store_name, store_address) = match tel_idx {
        Some(tel) if tel >= 1 => {
            let name = lines[0].to_string();
            let addr = lines[1..tel].join(", ");
            (name, (!addr.is_empty()).then_some(addr))
        }
        _ => {
            let banner = find_banner(&lines, "edeka");
            (
                banner
                    .map(|i| lines[i].to_string())
                    .unwrap_or_else(|| UNKNOWN_STORE.to_string()),
                None,
            )
        }
    };

    finish(Vendor::Edeka, store_name, store_address, scan)
}

/// Parse a LIDL receipt. Summary marker is "zu zahlen".
fn parse_lidl(ocr_text: &str) -> Result<ParsedReceipt> {
    let lines = non_empty_lines(ocr_text);
    let scan = scan_body(&lines, &LIDL_PROFILE)?;

    let banner = find_banner(&lines, "lidl");
    let store_name = banner
        .map(|i| lines[i].to_string())
        .unwrap_or_else(|| UNKNOWN_STORE.to_string());
    let store_address = banner.and_then(|i| address_after(&lines, i, 2));

    finish(Vendor::Lidl, store_name, store_address, scan)
}

/// Parse an ALDI receipt. Summary marker is "SUMME".
fn parse_aldi(ocr_text: &str) -> Result<ParsedReceipt> {
    let lines = non_empty_lines(ocr_text);
    let scan = scan_body(&lines, &ALDI_PROFILE)?;

    let banner = find_banner(&lines, "aldi");
    let store_name = banner
        .map(|i| lines[i].to_string())
        .unwrap_or_else(|| UNKNOWN_STORE.to_string());
    let store_address = banner.and_then(|i| address_after(&lines, i, 2));

    finish(Vendor::Aldi, store_name, store_address, scan)
}

/// Parse with the generic fallback grammar.
///
/// No signature matched, so the store is unknown; the caller must ask the
/// user for the name instead of guessing from the header.
fn parse_generic(ocr_text: &str) -> Result<ParsedReceipt> {
    let lines = non_empty_lines(ocr_text);
    let scan = scan_body(&lines, &GENERIC_PROFILE)?;
    finish(Vendor::Generic, UNKNOWN_STORE.to_string(), None, scan)
}

/// Intermediate result of the shared line walk
struct BodyScan {
    items: Vec<ReceiptItem>,
    total: Option<f64>,
    tax_details: Vec<TaxBreakdown>,
    date: Option<NaiveDate>,
}

/// Walk the receipt lines in two modes.
///
/// Item mode matches the item grammar (`<name> <price> <tax-letter>`) plus
/// weight/count detail lines that attach to the previous item. Once a
/// summary marker is seen, metadata mode scans for the grand total, tax
/// table rows and the purchase date instead.
fn scan_body(lines: &[&str], profile: &VendorProfile) -> Result<BodyScan> {
    let item_re = Regex::new(r"^(?P<name>.+?)\s+(?P<price>-?\d{1,4}[.,]\d{2})\s*(?P<tax>[AB])?\s*\*?$")?;
    let weight_re = Regex::new(
        r"(?i)^(?P<qty>\d+[.,]\d{1,3})\s*kg\s*[x×]\s*(?P<unit>\d+[.,]\d{2})\s*(?:eur|€)\s*/\s*kg(?:\s+(?P<price>\d+[.,]\d{2}))?\s*$",
    )?;
    let count_re = Regex::new(r"(?i)^(?P<qty>\d+)\s*(?:x|×|stk\s*x)\s*(?P<unit>\d+[.,]\d{2})\s*$")?;
    let tax_re = Regex::new(
        r"^(?:(?P<class>[AB])\s*=?\s*)?(?P<pct>\d{1,2}[.,]\d)\s*%\s+(?P<net>[\d.,]+)\s+(?P<tax>[\d.,]+)\s+(?P<gross>[\d.,]+)\s*$",
    )?;
    let bare_amount_re = Regex::new(r"(?i)^(?:eur\s*)?(?P<amount>-?\d+(?:\.\d{3})*[.,]\d{2})\s*(?:eur)?$")?;

    let mut items: Vec<ReceiptItem> = Vec::new();
    let mut total: Option<f64> = None;
    let mut tax_details: Vec<TaxBreakdown> = Vec::new();
    let mut date: Option<NaiveDate> = None;
    let mut in_summary = false;

    for line in lines {
        if date.is_none() {
            date = parse_date_token(line);
        }

        let lower = line.to_lowercase();

        if !in_summary
            && profile
                .summary_markers
                .iter()
                .any(|marker| lower.contains(marker))
        {
            in_summary = true;
            // The marker line usually carries the grand total itself.
            if total.is_none() {
                total = last_amount(line);
            }
            continue;
        }

        if in_summary {
            if let Some(caps) = tax_re.captures(line) {
                tax_details.push(tax_row(&caps));
                continue;
            }
            if total.is_none() {
                if let Some(caps) = bare_amount_re.captures(line) {
                    total = parse_price(&caps["amount"]);
                }
            }
            continue;
        }

        // Item-scanning mode. Detail lines modify the previous item; tax
        // rows can appear here on receipts without a summary marker.
        if let Some(caps) = weight_re.captures(line) {
            if let Some(last) = items.last_mut() {
                last.quantity = last.quantity.or_else(|| parse_quantity(&caps["qty"]));
                last.unit_price = last.unit_price.or_else(|| parse_price(&caps["unit"]));
            }
            continue;
        }
        if let Some(caps) = count_re.captures(line) {
            if let Some(last) = items.last_mut() {
                last.quantity = last.quantity.or_else(|| parse_quantity(&caps["qty"]));
                last.unit_price = last.unit_price.or_else(|| parse_price(&caps["unit"]));
            }
            continue;
        }
        if let Some(caps) = tax_re.captures(line) {
            tax_details.push(tax_row(&caps));
            continue;
        }

        if let Some(caps) = item_re.captures(line) {
            let name = clean_name(&caps["name"]);
            if name.is_empty() {
                continue;
            }
            let price = match parse_price(&caps["price"]) {
                Some(p) => p,
                None => {
                    // Single bad line, locally recovered; the receipt goes on.
                    debug!(line = *line, "dropping item line with invalid price");
                    continue;
                }
            };
            let tax_class = caps.name("tax").map(|m| match m.as_str() {
                "A" => TaxClass::A,
                _ => TaxClass::B,
            });

            items.push(ReceiptItem {
                name,
                category: Category::Other,
                total_price: price,
                quantity: None,
                unit_price: None,
                tax_class,
                source: ItemSource::Parser,
            });
        }
    }

    debug!(
        vendor = %profile.vendor,
        items = items.len(),
        total = ?total,
        tax_rows = tax_details.len(),
        "receipt body scanned"
    );

    Ok(BodyScan {
        items,
        total,
        tax_details,
        date,
    })
}

/// Assemble the final receipt, failing when the grammar matched nothing
fn finish(
    vendor: Vendor,
    store_name: String,
    store_address: Option<String>,
    scan: BodyScan,
) -> Result<ParsedReceipt> {
    if scan.items.is_empty() {
        return Err(Error::Validation(format!(
            "no line items recognized on {} receipt",
            vendor
        )));
    }

    let rec = reconcile::reconcile(scan.total, &scan.items)?;

    Ok(ParsedReceipt {
        vendor,
        store_name,
        store_address,
        purchase_date: scan.date,
        items: scan.items,
        total_amount: rec.total_amount,
        total_method: rec.total_method,
        tax_details: scan.tax_details,
        discrepancy_detected: rec.discrepancy_detected,
    })
}

/// Trimmed, non-empty lines of the OCR text
fn non_empty_lines(ocr_text: &str) -> Vec<&str> {
    ocr_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Index of the first line containing the vendor signature
fn find_banner(lines: &[&str], signature: &str) -> Option<usize> {
    lines
        .iter()
        .position(|l| l.to_lowercase().contains(signature))
}

/// Join the `count` lines following the banner into an address
fn address_after(lines: &[&str], banner_idx: usize, count: usize) -> Option<String> {
    let addr_lines: Vec<&str> = lines
        .iter()
        .skip(banner_idx + 1)
        .take(count)
        .copied()
        .collect();
    (!addr_lines.is_empty()).then(|| addr_lines.join(", "))
}

/// Strip OCR junk characters from an item name
fn clean_name(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || matches!(c, '|' | '©' | '_' | '*'))
        .to_string()
}

fn tax_row(caps: &regex::Captures) -> TaxBreakdown {
    let class = match caps.name("class").map(|m| m.as_str()) {
        Some("A") => TaxClass::A,
        Some("B") => TaxClass::B,
        _ => TaxClass::from_percent(&caps["pct"]),
    };
    TaxBreakdown {
        class,
        net: parse_price(&caps["net"]).unwrap_or(0.0),
        tax: parse_price(&caps["tax"]).unwrap_or(0.0),
        gross: parse_price(&caps["gross"]).unwrap_or(0.0),
    }
}

/// Last monetary token on a line, if any
fn last_amount(line: &str) -> Option<f64> {
    let amount_re = Regex::new(r"-?\d+(?:\.\d{3})*[.,]\d{2}").ok()?;
    amount_re
        .find_iter(line)
        .last()
        .and_then(|m| parse_price(m.as_str()))
}

/// Parse a date token like "14.03.2024" or "14.03.24" anywhere in the line
fn parse_date_token(line: &str) -> Option<NaiveDate> {
    let date_re = Regex::new(r"\b(\d{2}\.\d{2}\.(\d{2,4}))\b").ok()?;
    let caps = date_re.captures(line)?;
    let token = caps.get(1)?.as_str();

    // %Y would happily read "23" as the year 23, so the year width picks
    // the format instead.
    let fmt = if caps.get(2)?.as_str().len() == 4 {
        "%d.%m.%Y"
    } else {
        "%d.%m.%y"
    };
    NaiveDate::parse_from_str(token, fmt).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TotalMethod;

    const REWE_RECEIPT: &str = "\
REWE Markt GmbH
Hauptstr. 5
12345 Musterstadt
UID Nr.: DE812706034

BIO BANANEN 1,99 B
AEPFEL BRAEBURN 2,49 B
0,456 kg x 2,99 EUR/kg
MILCH 1,5% 1,09 B
SPUELMITTEL 0,85 A
SUMME EUR 6,42
Geg. Mastercard EUR 6,42
Steuer % Netto Steuer Brutto
A= 19,0% 0,71 0,14 0,85
B= 7,0% 5,21 0,36 5,57
Gesamtbetrag 5,92 0,50 6,42
14.03.2024 18:32 Bon-Nr.:4711
";

    const EDEKA_RECEIPT: &str = "\
E aktiv markt Meier
Marktplatz 2
54321 Beispielstadt
Tel. 0221/998877
EDEKA
----------------------------
JOGHURT NATUR 0,59 B
VOLLKORNBROT 2,19 B
SALAMI 1,98 B
2 x 0,99
KAFFEE CREMA 4,99 A
----------------------------
Summe EUR 9,75
BAR EUR 10,00
Rueckgeld EUR -0,25
19.04.2024 11:03
A = 19,0% 4,19 0,80 4,99
B = 7,0% 4,45 0,31 4,76
";

    const LIDL_RECEIPT: &str = "\
Lidl Dienstleistung GmbH
Bonner Str. 44
51379 Leverkusen
H-MILCH 3,5% 0,99 B
BUTTER 2,29 B
TOMATEN 1,49 B
0,750 kg x 1,99 EUR/kg 1,49
zu zahlen 4,77
Kreditkarte 4,77
B 7,0% 4,46 0,31 4,77
21.06.2024 17:45
";

    const ALDI_RECEIPT: &str = "\
ALDI SUED
Industriestr. 7
86551 Aichach
MINERALWASSER 0,45 A
PFAND 0,25 A
SCHOKOLADE 1,19 A
SUMME 1,89
Kartenzahlung
Girocard
A= 19,0% 1,59 0,30 1,89
05.02.2024 09:12
";

    const GENERIC_RECEIPT: &str = "\
Getraenkemarkt
Colastr. 9
APFELSAFT 1,79
WASSER 0,89
TOTAL 2,68
";

    #[test]
    fn test_detect_vendor() {
        assert_eq!(detect_vendor(REWE_RECEIPT), Vendor::Rewe);
        assert_eq!(detect_vendor(EDEKA_RECEIPT), Vendor::Edeka);
        assert_eq!(detect_vendor(LIDL_RECEIPT), Vendor::Lidl);
        assert_eq!(detect_vendor(ALDI_RECEIPT), Vendor::Aldi);
        assert_eq!(detect_vendor(GENERIC_RECEIPT), Vendor::Generic);
    }

    #[test]
    fn test_detect_vendor_is_case_insensitive() {
        assert_eq!(detect_vendor("rewe markt\nfoo 1,00 A\nSUMME 1,00"), Vendor::Rewe);
    }

    #[test]
    fn test_detect_vendor_priority_order() {
        // Both signatures present: REWE is checked first.
        let text = "REWE Markt\nehemals EDEKA Center";
        assert_eq!(detect_vendor(text), Vendor::Rewe);
    }

    #[test]
    fn test_parse_rewe() {
        let receipt = parse_receipt(REWE_RECEIPT).unwrap();

        assert_eq!(receipt.vendor, Vendor::Rewe);
        assert_eq!(receipt.store_name, "REWE Markt GmbH");
        assert_eq!(
            receipt.store_address.as_deref(),
            Some("Hauptstr. 5, 12345 Musterstadt")
        );
        assert_eq!(
            receipt.purchase_date,
            NaiveDate::from_ymd_opt(2024, 3, 14)
        );

        assert_eq!(receipt.items.len(), 4);
        assert_eq!(receipt.items[0].name, "BIO BANANEN");
        assert_eq!(receipt.items[0].total_price, 1.99);
        assert_eq!(receipt.items[0].tax_class, Some(TaxClass::B));

        // Weight detail line attaches to the preceding item.
        assert_eq!(receipt.items[1].name, "AEPFEL BRAEBURN");
        assert_eq!(receipt.items[1].quantity, Some(0.456));
        assert_eq!(receipt.items[1].unit_price, Some(2.99));

        // Item names may legitimately contain a percent sign.
        assert_eq!(receipt.items[2].name, "MILCH 1,5%");
        assert_eq!(receipt.items[3].tax_class, Some(TaxClass::A));

        assert_eq!(receipt.total_amount, 6.42);
        assert_eq!(receipt.total_method, TotalMethod::Explicit);
        assert!(!receipt.discrepancy_detected);

        assert_eq!(receipt.tax_details.len(), 2);
        assert_eq!(receipt.tax_details[0].class, TaxClass::A);
        assert_eq!(receipt.tax_details[0].net, 0.71);
        assert_eq!(receipt.tax_details[0].tax, 0.14);
        assert_eq!(receipt.tax_details[0].gross, 0.85);
        assert_eq!(receipt.tax_details[1].class, TaxClass::B);
    }

    #[test]
    fn test_parse_edeka() {
        let receipt = parse_receipt(EDEKA_RECEIPT).unwrap();

        assert_eq!(receipt.vendor, Vendor::Edeka);
        assert_eq!(receipt.store_name, "E aktiv markt Meier");
        assert_eq!(
            receipt.store_address.as_deref(),
            Some("Marktplatz 2, 54321 Beispielstadt")
        );

        assert_eq!(receipt.items.len(), 4);
        // Count detail line attaches quantity and unit price.
        assert_eq!(receipt.items[2].name, "SALAMI");
        assert_eq!(receipt.items[2].quantity, Some(2.0));
        assert_eq!(receipt.items[2].unit_price, Some(0.99));

        assert_eq!(receipt.total_amount, 9.75);
        assert!(!receipt.discrepancy_detected);
        assert_eq!(
            receipt.purchase_date,
            NaiveDate::from_ymd_opt(2024, 4, 19)
        );
        assert_eq!(receipt.tax_details.len(), 2);
    }

    #[test]
    fn test_parse_lidl() {
        let receipt = parse_receipt(LIDL_RECEIPT).unwrap();

        assert_eq!(receipt.vendor, Vendor::Lidl);
        assert_eq!(receipt.store_name, "Lidl Dienstleistung GmbH");
        assert_eq!(
            receipt.store_address.as_deref(),
            Some("Bonner Str. 44, 51379 Leverkusen")
        );

        assert_eq!(receipt.items.len(), 3);
        assert_eq!(receipt.items[2].name, "TOMATEN");
        assert_eq!(receipt.items[2].quantity, Some(0.75));
        assert_eq!(receipt.items[2].unit_price, Some(1.99));

        // "zu zahlen" is the LIDL summary marker.
        assert_eq!(receipt.total_amount, 4.77);
        assert_eq!(receipt.total_method, TotalMethod::Explicit);
        assert!(!receipt.discrepancy_detected);

        assert_eq!(receipt.tax_details.len(), 1);
        assert_eq!(receipt.tax_details[0].class, TaxClass::B);
        assert_eq!(receipt.tax_details[0].gross, 4.77);
    }

    #[test]
    fn test_parse_aldi() {
        let receipt = parse_receipt(ALDI_RECEIPT).unwrap();

        assert_eq!(receipt.vendor, Vendor::Aldi);
        assert_eq!(receipt.store_name, "ALDI SUED");
        assert_eq!(receipt.items.len(), 3);
        assert_eq!(receipt.total_amount, 1.89);
        assert!(!receipt.discrepancy_detected);
        assert_eq!(
            receipt.purchase_date,
            NaiveDate::from_ymd_opt(2024, 2, 5)
        );
    }

    #[test]
    fn test_parse_generic_uses_store_sentinel() {
        let receipt = parse_receipt(GENERIC_RECEIPT).unwrap();

        assert_eq!(receipt.vendor, Vendor::Generic);
        assert_eq!(receipt.store_name, UNKNOWN_STORE);
        assert!(receipt.needs_store_name());
        assert!(receipt.store_address.is_none());

        assert_eq!(receipt.items.len(), 2);
        assert!(receipt.items.iter().all(|i| i.tax_class.is_none()));
        assert_eq!(receipt.total_amount, 2.68);
    }

    #[test]
    fn test_mismatched_total_sets_discrepancy() {
        let text = REWE_RECEIPT.replace("SUMME EUR 6,42", "SUMME EUR 7,00");
        let receipt = parse_receipt(&text).unwrap();
        assert!(receipt.discrepancy_detected);
        assert_eq!(receipt.total_amount, 7.00);
    }

    #[test]
    fn test_missing_total_is_calculated() {
        let text = "\
REWE City
Bahnhofstr. 1
10999 Berlin
BREZEL 0,79 B
KABA 2,19 B
";
        let receipt = parse_receipt(text).unwrap();
        assert_eq!(receipt.total_method, TotalMethod::Calculated);
        assert_eq!(receipt.total_amount, 2.98);
        assert!(!receipt.discrepancy_detected);
    }

    #[test]
    fn test_zero_items_fails_with_validation_error() {
        let text = "\
REWE Markt GmbH
Hauptstr. 5
12345 Musterstadt
SUMME EUR 1,00
";
        let err = parse_receipt(text).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_unparseable_item_line_is_dropped_not_fatal() {
        let text = "\
ALDI Nord
Weststr. 2
44137 Dortmund
KAFFEE 4,29 A
NUDELN |,|| B
REIS 1,99 B
SUMME 6,28
";
        let receipt = parse_receipt(text).unwrap();
        // The garbled middle line is skipped; the rest parses.
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[0].name, "KAFFEE");
        assert_eq!(receipt.items[1].name, "REIS");
    }

    #[test]
    fn test_ocr_noise_in_item_names_is_stripped() {
        let text = "\
LIDL
Mainzer Str. 8
65189 Wiesbaden
|BANANEN© 1,49 B
zu zahlen 1,49
";
        let receipt = parse_receipt(text).unwrap();
        assert_eq!(receipt.items[0].name, "BANANEN");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse_receipt(REWE_RECEIPT).unwrap();
        let second = parse_receipt(REWE_RECEIPT).unwrap();
        assert_eq!(first, second);

        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn test_negative_deposit_return_lines_are_dropped() {
        let text = "\
REWE Center
Nordring 3
90402 Nuernberg
LEERGUT -0,75 A
BIER 3,99 A
SUMME 3,24
";
        let receipt = parse_receipt(text).unwrap();
        // Negative prices fail validation and the line is dropped.
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].name, "BIER");
        // The dropped deposit line makes the declared total diverge.
        assert!(receipt.discrepancy_detected);
    }

    #[test]
    fn test_total_on_line_after_marker() {
        let text = "\
EDEKA Schmidt
Am Markt 1
Tel. 040/112233
BROT 1,49 B
-- SUMME --
EUR 1,49
";
        let receipt = parse_receipt(text).unwrap();
        assert_eq!(receipt.total_amount, 1.49);
        assert_eq!(receipt.total_method, TotalMethod::Explicit);
    }

    #[test]
    fn test_two_digit_year_date() {
        let text = "\
ALDI
Suedstr. 1
50678 Koeln
MEHL 0,89 B
SUMME 0,89
03.11.23 16:20
";
        let receipt = parse_receipt(text).unwrap();
        assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2023, 11, 3));
    }
}
