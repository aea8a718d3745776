//! Numeric extraction from free-form clinical result strings.
//!
//! Handles the formats LIS exports use for quantitative results:
//! - Plain numbers and scientific notation: `"123"`, `"1.5e-3"`
//! - Thousands separators: `"1,234.56"`
//! - Exponent form: `"10^3"` → 1000
//! - Titers: `"1:128"` → 128 (the dilution, not the ratio)
//! - Intervals: `"1.5-2.0"` → 1.75 (the midpoint)
//! - Comparison prefixes: `"<0.5"` → 0.5, `"≥10"` → 10
//! - Full-width digits: `"１２．５"` → 12.5

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static POWER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+\.?[0-9]*)\s*\^\s*([0-9]+)").expect("Invalid power regex")
});

/// Full-string `a-b` interval. Anchored so that `-5` or `1-2-3` never match.
pub(crate) static INTERVAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+\.?[0-9]*)\s*-\s*([0-9]+\.?[0-9]*)$").expect("Invalid interval regex")
});

static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?").expect("Invalid number regex")
});

/// Comparison and approximation symbols stripped before the final substring search.
const COMPARISON_SYMBOLS: [char; 6] = ['<', '>', '≤', '≥', '~', '±'];

/// Parses a complete string as `f64` after trimming.
///
/// Accepts integers, decimals, scientific notation and the textual
/// `inf`/`nan` forms; the caller decides what to do with non-finite results.
pub fn parse_plain_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Rewrites full-width digits and the full-width full stop as ASCII.
///
/// Borrows the input unchanged when it holds no full-width characters.
pub fn fold_fullwidth_digits(value: &str) -> Cow<'_, str> {
    if !value.chars().any(is_fullwidth_numeric) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .chars()
            .map(|ch| match ch {
                '\u{FF10}'..='\u{FF19}' => {
                    char::from_u32(u32::from(ch) - 0xFF10 + u32::from('0')).unwrap_or(ch)
                }
                '\u{FF0E}' => '.',
                _ => ch,
            })
            .collect(),
    )
}

fn is_fullwidth_numeric(ch: char) -> bool {
    matches!(ch, '\u{FF10}'..='\u{FF19}' | '\u{FF0E}')
}

/// Removes thousands-separator commas.
pub fn strip_thousands_separators(value: &str) -> String {
    value.replace(',', "")
}

/// Extracts a numeric value from a raw result string.
///
/// Rules are tried in priority order and the first success wins:
///
/// 1. Direct parse after removing thousands separators.
/// 2. Exponent form `base^exponent`.
/// 3. Titer `a:b` (exactly one colon) → `b`.
/// 4. Interval `a-b` (no leading minus) → `(a + b) / 2`.
/// 5. First numeric substring after stripping `< > ≤ ≥ ~ ±`.
///
/// Returns `None` when no rule applies. The result may be non-finite (for
/// example `"inf"` or `"10^400"`); validity is the value parser's concern.
///
/// # Examples
///
/// ```
/// use lis_transform::extract_numeric;
///
/// assert_eq!(extract_numeric("1:128"), Some(128.0));
/// assert_eq!(extract_numeric("1.5-2.0"), Some(1.75));
/// assert_eq!(extract_numeric("10^3"), Some(1000.0));
/// assert_eq!(extract_numeric("<0.5"), Some(0.5));
/// assert_eq!(extract_numeric("阴性"), None);
/// ```
pub fn extract_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = strip_thousands_separators(&fold_fullwidth_digits(trimmed));

    parse_plain_number(&value)
        .or_else(|| extract_power(&value))
        .or_else(|| extract_titer(&value))
        .or_else(|| extract_interval(&value))
        .or_else(|| extract_first_number(&value))
}

fn extract_power(value: &str) -> Option<f64> {
    if !value.contains('^') {
        return None;
    }
    let caps = POWER_REGEX.captures(value)?;
    let base: f64 = caps.get(1)?.as_str().parse().ok()?;
    let exponent: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some(base.powf(exponent))
}

fn extract_titer(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let (_dilution, titer) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    parse_plain_number(titer)
}

fn extract_interval(value: &str) -> Option<f64> {
    if value.starts_with('-') {
        return None;
    }
    let caps = INTERVAL_REGEX.captures(value)?;
    let lower: f64 = caps.get(1)?.as_str().parse().ok()?;
    let upper: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some((lower + upper) / 2.0)
}

fn extract_first_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|ch| !COMPARISON_SYMBOLS.contains(ch))
        .collect();
    NUMBER_REGEX.find(&cleaned)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(extract_numeric("123"), Some(123.0));
        assert_eq!(extract_numeric("  45.67 "), Some(45.67));
        assert_eq!(extract_numeric("-0.5"), Some(-0.5));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(extract_numeric("1.5e-3"), Some(0.0015));
        assert_eq!(extract_numeric("2E+5"), Some(200000.0));
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(extract_numeric("1,234.56"), Some(1234.56));
        assert_eq!(extract_numeric("12,000"), Some(12000.0));
    }

    #[test]
    fn test_power() {
        assert_eq!(extract_numeric("10^3"), Some(1000.0));
        assert_eq!(extract_numeric("2 ^ 10"), Some(1024.0));
    }

    #[test]
    fn test_titer_returns_dilution() {
        assert_eq!(extract_numeric("1:128"), Some(128.0));
        assert_eq!(extract_numeric("1: 64"), Some(64.0));
    }

    #[test]
    fn test_titer_requires_single_colon() {
        // Falls through to the substring search, which finds the first number.
        assert_eq!(extract_numeric("1:2:3"), Some(1.0));
    }

    #[test]
    fn test_interval_midpoint() {
        assert_eq!(extract_numeric("1.5-2.0"), Some(1.75));
        assert_eq!(extract_numeric("10 - 20"), Some(15.0));
    }

    #[test]
    fn test_negative_number_is_not_interval() {
        assert_eq!(extract_numeric("-5"), Some(-5.0));
        // Leading minus: interval rule skipped, substring search keeps the sign.
        assert_eq!(extract_numeric("-5-10"), Some(-5.0));
    }

    #[test]
    fn test_comparison_prefixes() {
        assert_eq!(extract_numeric("<0.5"), Some(0.5));
        assert_eq!(extract_numeric(">1000"), Some(1000.0));
        assert_eq!(extract_numeric("≤5"), Some(5.0));
        assert_eq!(extract_numeric("≥10"), Some(10.0));
        assert_eq!(extract_numeric("~3.2"), Some(3.2));
    }

    #[test]
    fn test_embedded_number() {
        assert_eq!(extract_numeric("5.6 mmol/L"), Some(5.6));
        assert_eq!(extract_numeric("约12"), Some(12.0));
    }

    #[test]
    fn test_no_number() {
        assert_eq!(extract_numeric(""), None);
        assert_eq!(extract_numeric("   "), None);
        assert_eq!(extract_numeric("阴性"), None);
        assert_eq!(extract_numeric("hemolyzed"), None);
    }

    #[test]
    fn test_fullwidth_digits() {
        assert_eq!(extract_numeric("１２"), Some(12.0));
        assert_eq!(extract_numeric("１２．５"), Some(12.5));
        assert_eq!(extract_numeric("１:１２８"), Some(128.0));
        assert_eq!(fold_fullwidth_digits("５.６ mmol/L"), "5.6 mmol/L");
        assert!(matches!(fold_fullwidth_digits("5.6"), Cow::Borrowed("5.6")));
    }

    #[test]
    fn test_non_ascii_digits_are_not_numbers() {
        // Arabic-Indic digits are not folded; the regexes only accept ASCII.
        assert_eq!(extract_numeric("١٢"), None);
    }

    #[test]
    fn test_non_finite_passes_through() {
        assert!(extract_numeric("inf").unwrap().is_infinite());
        assert!(extract_numeric("10^400").unwrap().is_infinite());
    }
}
