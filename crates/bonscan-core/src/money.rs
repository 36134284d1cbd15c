//! Price and number normalization for OCR'd receipt text
//!
//! Receipt amounts arrive with European comma decimals, stray currency
//! symbols, and OCR noise (pipes, copyright signs, underscores). Everything
//! here returns `Option` rather than an error: an unparseable amount means
//! "drop this line", never a failed receipt.

/// Upper bound for a plausible single line-item or receipt amount
const MAX_AMOUNT: f64 = 1000.0;

/// Parse a locale-formatted monetary token into a validated amount.
///
/// Rules:
/// - Strip all characters except digits, `.`, `,`, `-`.
/// - The final trailing group of 1-2 digits after a separator is the
///   decimal part; all other separators are thousands grouping.
/// - The result must satisfy `0 < p < 1000`. A magnitude >= 1000 is retried
///   once divided by 100 (OCR dropping the decimal separator doubles the
///   digit count) and accepted only if the corrected value is in range.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let negative = cleaned.starts_with('-');

    let value = match cleaned.rfind([',', '.']) {
        Some(pos) => {
            let frac: String = cleaned[pos + 1..]
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            if (1..=2).contains(&frac.len()) {
                let int_digits: String = cleaned[..pos]
                    .chars()
                    .filter(|c| c.is_ascii_digit())
                    .collect();
                let int_part: f64 = if int_digits.is_empty() {
                    0.0
                } else {
                    int_digits.parse().ok()?
                };
                let frac_part: f64 = frac.parse().ok()?;
                int_part + frac_part / 10f64.powi(frac.len() as i32)
            } else {
                // Trailing group too long to be a decimal part; treat every
                // separator as grouping noise.
                digits_value(&cleaned)?
            }
        }
        None => digits_value(&cleaned)?,
    };

    let value = if negative { -value } else { value };

    if value > 0.0 && value < MAX_AMOUNT {
        return Some(round2(value));
    }

    if value >= MAX_AMOUNT {
        let corrected = value / 100.0;
        if corrected > 0.0 && corrected < MAX_AMOUNT {
            return Some(round2(corrected));
        }
    }

    None
}

/// Parse a quantity token like "0,456" (kg) or "2"
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.replace(',', ".").parse().ok()?;
    (value > 0.0).then_some(value)
}

/// Round to 2-decimal monetary precision
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn digits_value(cleaned: &str) -> Option<f64> {
    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
