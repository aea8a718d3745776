//! Value-format detection for profile authoring.
//!
//! These heuristics survey a result column before a profile exists, so they
//! use fixed keyword lists instead of configured [`ParsingRules`] tables.
//!
//! [`ParsingRules`]: lis_model::ParsingRules

use std::collections::{BTreeMap, BTreeSet, HashSet};

use lis_model::ValueFlag;
use serde::Serialize;

use crate::normalization::numeric::{
    fold_fullwidth_digits, parse_plain_number, strip_thousands_separators,
};
use crate::parser::detect_numeric_format;

/// Default number of distinct values surveyed.
pub const DEFAULT_MAX_SAMPLES: usize = 100;

/// Examples kept per category.
pub const SAMPLES_PER_FORMAT: usize = 3;

const INVALID_KEYWORDS: [&str; 9] = [
    "溶血", "样本不足", "标本凝集", "未检出", "--", "/", "#", "NA", "N/A",
];
const POSITIVE_KEYWORDS: [&str; 4] = ["阳性", "阳", "+", "positive"];
const NEGATIVE_KEYWORDS: [&str; 3] = ["阴性", "阴", "negative"];

/// Categories reported by [`detect_value_formats`], in report order.
pub const DETECTED_FORMATS: [ValueFlag; 10] = [
    ValueFlag::Normal,
    ValueFlag::Scientific,
    ValueFlag::Power,
    ValueFlag::Titer,
    ValueFlag::Range,
    ValueFlag::LessThan,
    ValueFlag::GreaterThan,
    ValueFlag::TextPositive,
    ValueFlag::TextNegative,
    ValueFlag::Invalid,
];

/// Count and examples for one detected format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatStats {
    pub count: usize,
    pub samples: Vec<String>,
}

/// Distribution of formats over the distinct values of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatSummary {
    pub formats: BTreeMap<ValueFlag, FormatStats>,
    pub total: usize,
}

impl FormatSummary {
    fn new() -> Self {
        Self {
            formats: DETECTED_FORMATS
                .into_iter()
                .map(|flag| (flag, FormatStats::default()))
                .collect(),
            total: 0,
        }
    }

    fn record(&mut self, flag: ValueFlag, value: &str) {
        let stats = self.formats.entry(flag).or_default();
        stats.count += 1;
        if stats.samples.len() < SAMPLES_PER_FORMAT {
            stats.samples.push(value.to_string());
        }
        self.total += 1;
    }

    pub fn count(&self, flag: ValueFlag) -> usize {
        self.formats.get(&flag).map_or(0, |stats| stats.count)
    }

    pub fn samples(&self, flag: ValueFlag) -> &[String] {
        self.formats
            .get(&flag)
            .map_or(&[], |stats| stats.samples.as_slice())
    }
}

/// Classifies a single trimmed value with the survey heuristics.
pub fn detect_format(value: &str) -> ValueFlag {
    let folded = fold_fullwidth_digits(value);
    let value = folded.as_ref();
    if INVALID_KEYWORDS.iter().any(|kw| value.contains(kw)) {
        return ValueFlag::Invalid;
    }
    let lowered = value.to_lowercase();
    if POSITIVE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ValueFlag::TextPositive;
    }
    if NEGATIVE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ValueFlag::TextNegative;
    }
    if value.starts_with('<') || value.starts_with('≤') {
        return ValueFlag::LessThan;
    }
    if value.starts_with('>') || value.starts_with('≥') {
        return ValueFlag::GreaterThan;
    }
    if let Some(flag) = detect_numeric_format(value) {
        return flag;
    }
    if parse_plain_number(&strip_thousands_separators(value)).is_some() {
        ValueFlag::Normal
    } else {
        ValueFlag::Invalid
    }
}

/// Surveys the first `max_samples` distinct non-empty values.
///
/// Values are trimmed before deduplication; first-seen order decides which
/// values are surveyed and which become samples.
pub fn detect_value_formats<I, S>(values: I, max_samples: usize) -> FormatSummary
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut summary = FormatSummary::new();
    let mut seen = HashSet::new();

    for value in values.into_iter().flatten() {
        if seen.len() >= max_samples {
            break;
        }
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            continue;
        }
        summary.record(detect_format(trimmed), trimmed);
    }
    summary
}

/// Distinct special values grouped by kind, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecialValuePatterns {
    pub less_than: Vec<String>,
    pub greater_than: Vec<String>,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub invalid: Vec<String>,
}

/// Collects the censored, qualitative and invalid values of a column.
///
/// Used to seed a profile's token tables; values that look numeric are ignored.
pub fn detect_special_value_patterns<I, S>(values: I) -> SpecialValuePatterns
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut less_than = BTreeSet::new();
    let mut greater_than = BTreeSet::new();
    let mut positive = BTreeSet::new();
    let mut negative = BTreeSet::new();
    let mut invalid = BTreeSet::new();

    for value in values.into_iter().flatten() {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let bucket = if trimmed.starts_with('<') {
            &mut less_than
        } else if trimmed.starts_with('>') {
            &mut greater_than
        } else if trimmed.contains('阳') {
            &mut positive
        } else if trimmed.contains('阴') {
            &mut negative
        } else if INVALID_KEYWORDS.contains(&trimmed) {
            &mut invalid
        } else {
            continue;
        };
        bucket.insert(trimmed.to_string());
    }

    SpecialValuePatterns {
        less_than: less_than.into_iter().collect(),
        greater_than: greater_than.into_iter().collect(),
        positive: positive.into_iter().collect(),
        negative: negative.into_iter().collect(),
        invalid: invalid.into_iter().collect(),
    }
}
