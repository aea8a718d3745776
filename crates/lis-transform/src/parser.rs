//! Rule-driven classification of raw result strings.
//!
//! [`ValueParser`] evaluates an explicit, ordered list of [`RuleKind`]s
//! against each value; the first rule that claims the value decides the
//! numeric result and the [`ValueFlag`]. Values no rule claims are
//! `invalid` with no number.

use std::sync::LazyLock;

use lis_model::{GreaterThanPolicy, LessThanPolicy, ParsedValue, ParsingRules, TokenMap, ValueFlag};
use regex::Regex;

use crate::normalization::numeric::{
    INTERVAL_REGEX, extract_numeric, fold_fullwidth_digits, parse_plain_number,
    strip_thousands_separators,
};

static SCIENTIFIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]+\.?[0-9]*[eE][-+]?[0-9]+").expect("Invalid scientific regex")
});

static TITER_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+:[0-9]+").expect("Invalid titer regex"));

/// One step of the classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Substring match against the invalid-value tokens.
    InvalidText,
    /// Substring match against the positive tokens.
    PositiveText,
    /// Exact match against the negative tokens.
    NegativeText,
    /// `<` or `≤` prefix.
    LessThan,
    /// `>` or `≥` prefix.
    GreaterThan,
    /// Scientific, exponent, titer or interval notation.
    Format,
    /// Direct parse after removing thousands separators.
    Plain,
    /// Numeric substring extraction.
    Fallback,
}

/// Classification order. The first rule returning a value wins.
pub const RULE_ORDER: [RuleKind; 8] = [
    RuleKind::InvalidText,
    RuleKind::PositiveText,
    RuleKind::NegativeText,
    RuleKind::LessThan,
    RuleKind::GreaterThan,
    RuleKind::Format,
    RuleKind::Plain,
    RuleKind::Fallback,
];

/// A token table prepared for matching: lowercased, longest token first.
///
/// Sorting by length means `弱阳性` is tried before `阳性`, so a configured
/// weak-positive value is never shadowed by the shorter token it contains.
/// Tokens of equal length keep their declaration order.
#[derive(Debug, Clone, Default)]
struct TokenTable {
    tokens: Vec<(String, Option<f64>)>,
}

impl TokenTable {
    fn new(mapping: &TokenMap) -> Self {
        let mut tokens: Vec<(String, Option<f64>)> = mapping
            .iter()
            .filter(|(token, _)| !token.is_empty())
            .map(|(token, value)| (token.to_lowercase(), *value))
            .collect();
        tokens.sort_by_key(|(token, _)| std::cmp::Reverse(token.chars().count()));
        Self { tokens }
    }

    fn find_substring(&self, haystack: &str) -> Option<Option<f64>> {
        self.tokens
            .iter()
            .find(|(token, _)| haystack.contains(token.as_str()))
            .map(|(_, value)| *value)
    }

    fn find_exact(&self, value: &str) -> Option<Option<f64>> {
        self.tokens
            .iter()
            .find(|(token, _)| token == value)
            .map(|(_, value)| *value)
    }
}

/// Classifies raw result strings into a numeric value and a flag.
///
/// Built once per run from immutable [`ParsingRules`]. Parsing is a pure
/// function of the input and the rules, so a parser can be shared across
/// threads freely.
#[derive(Debug, Clone)]
pub struct ValueParser {
    rules: ParsingRules,
    invalid: TokenTable,
    positive: TokenTable,
    negative: TokenTable,
}

impl Default for ValueParser {
    fn default() -> Self {
        Self::new(ParsingRules::default())
    }
}

impl ValueParser {
    pub fn new(rules: ParsingRules) -> Self {
        let invalid = TokenTable::new(&rules.invalid_values.mapping);
        let positive = TokenTable::new(&rules.positive_text.mapping);
        let negative = TokenTable::new(&rules.negative_text.mapping);
        Self {
            rules,
            invalid,
            positive,
            negative,
        }
    }

    /// Parses one raw result string.
    ///
    /// Returns `None` for blank input, which is distinct from a value that
    /// was read but could not be interpreted (`Some` with flag `invalid`).
    ///
    /// # Examples
    ///
    /// ```
    /// use lis_model::ValueFlag;
    /// use lis_transform::ValueParser;
    ///
    /// let parser = ValueParser::default();
    /// let parsed = parser.parse("<0.5").unwrap();
    /// assert_eq!(parsed.numeric, Some(0.25));
    /// assert_eq!(parsed.flag, ValueFlag::LessThan);
    /// assert!(parser.parse("  ").is_none());
    /// ```
    pub fn parse(&self, raw: &str) -> Option<ParsedValue> {
        self.classify(raw).map(|(_, parsed)| parsed)
    }

    /// Parses an optional cell; `None` and blank cells carry no flag.
    pub fn parse_cell(&self, raw: Option<&str>) -> Option<ParsedValue> {
        raw.and_then(|value| self.parse(value))
    }

    /// Parses a value and reports which rule decided it.
    ///
    /// The rule is `None` when no rule claimed the value and the result is
    /// the unparseable fallback.
    pub fn classify(&self, raw: &str) -> Option<(Option<RuleKind>, ParsedValue)> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let value = fold_fullwidth_digits(trimmed);
        let lowered = value.to_lowercase();

        for kind in RULE_ORDER {
            if let Some(parsed) = self.apply_rule(kind, &value, &lowered) {
                return Some((Some(kind), parsed));
            }
        }
        Some((None, ParsedValue::invalid()))
    }

    fn apply_rule(&self, kind: RuleKind, value: &str, lowered: &str) -> Option<ParsedValue> {
        match kind {
            RuleKind::InvalidText => self
                .invalid
                .find_substring(lowered)
                .map(|replacement| ParsedValue::new(replacement, ValueFlag::Invalid)),
            RuleKind::PositiveText => self
                .positive
                .find_substring(lowered)
                .map(|replacement| ParsedValue::new(replacement, ValueFlag::TextPositive)),
            RuleKind::NegativeText => self
                .negative
                .find_exact(lowered)
                .map(|replacement| ParsedValue::new(replacement, ValueFlag::TextNegative)),
            RuleKind::LessThan => self.less_than(value),
            RuleKind::GreaterThan => self.greater_than(value),
            RuleKind::Format => self.tagged_format(value),
            RuleKind::Plain => parse_plain_number(&strip_thousands_separators(value))
                .map(|numeric| self.validate(numeric, ValueFlag::Normal)),
            RuleKind::Fallback => {
                extract_numeric(value).map(|numeric| self.validate(numeric, ValueFlag::Normal))
            }
        }
    }

    fn less_than(&self, value: &str) -> Option<ParsedValue> {
        if !(value.starts_with('<') || value.starts_with('≤')) {
            return None;
        }
        let magnitude = censored_magnitude(value)?;
        let numeric = match self.rules.less_than.rule {
            LessThanPolicy::Half => Some(magnitude / 2.0),
            LessThanPolicy::LowerBound => Some(magnitude),
            LessThanPolicy::Na => None,
        };
        Some(ParsedValue::new(numeric, ValueFlag::LessThan))
    }

    fn greater_than(&self, value: &str) -> Option<ParsedValue> {
        if !(value.starts_with('>') || value.starts_with('≥')) {
            return None;
        }
        let magnitude = censored_magnitude(value)?;
        let rule = &self.rules.greater_than;
        let numeric = match rule.rule {
            GreaterThanPolicy::Keep => Some(magnitude),
            GreaterThanPolicy::Cap => Some(rule.cap_value.unwrap_or(magnitude)),
            GreaterThanPolicy::Na => None,
        };
        Some(ParsedValue::new(numeric, ValueFlag::GreaterThan))
    }

    fn tagged_format(&self, value: &str) -> Option<ParsedValue> {
        let flag = detect_numeric_format(value)?;
        extract_numeric(value).map(|numeric| self.validate(numeric, flag))
    }

    /// Rejects non-finite numbers and tags out-of-threshold magnitudes.
    fn validate(&self, numeric: f64, flag: ValueFlag) -> ParsedValue {
        if !numeric.is_finite() {
            return ParsedValue::invalid();
        }
        if numeric.abs() > self.rules.extreme_value_threshold {
            return ParsedValue::new(Some(numeric), ValueFlag::ExtremeValue);
        }
        ParsedValue::new(Some(numeric), flag)
    }
}

/// Magnitude of a censored value, or `None` so later rules can try it.
fn censored_magnitude(value: &str) -> Option<f64> {
    extract_numeric(value).filter(|magnitude| magnitude.is_finite())
}

/// Detects scientific, exponent, titer and interval notation, in that order.
pub(crate) fn detect_numeric_format(value: &str) -> Option<ValueFlag> {
    if SCIENTIFIC_REGEX.is_match(value) {
        Some(ValueFlag::Scientific)
    } else if value.contains('^') {
        Some(ValueFlag::Power)
    } else if TITER_PREFIX_REGEX.is_match(value) {
        Some(ValueFlag::Titer)
    } else if !value.starts_with('-') && INTERVAL_REGEX.is_match(value) {
        Some(ValueFlag::Range)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis_model::TextRule;

    fn parse(value: &str) -> ParsedValue {
        ValueParser::default().parse(value).unwrap()
    }

    #[test]
    fn fullwidth_digits_parse_as_numbers() {
        let (rule, parsed) = ValueParser::default().classify("１２").unwrap();
        assert_eq!(rule, Some(RuleKind::Plain));
        assert_eq!(parsed, ParsedValue::new(Some(12.0), ValueFlag::Normal));

        assert_eq!(parse("１２．５").numeric, Some(12.5));
        assert_eq!(parse("<０.５"), ParsedValue::new(Some(0.25), ValueFlag::LessThan));
        assert_eq!(parse("１:１２８").flag, ValueFlag::Titer);
    }

    #[test]
    fn invalid_tokens_take_priority() {
        let parsed = parse("溶血");
        assert_eq!(parsed, ParsedValue::invalid());

        // "--" contains "-", which is also a negative token
        let (rule, parsed) = ValueParser::default().classify("--").unwrap();
        assert_eq!(rule, Some(RuleKind::InvalidText));
        assert_eq!(parsed.flag, ValueFlag::Invalid);
    }

    #[test]
    fn invalid_tokens_match_case_insensitively() {
        assert_eq!(parse("na").flag, ValueFlag::Invalid);
        assert_eq!(parse("n/a").flag, ValueFlag::Invalid);
    }

    #[test]
    fn weak_positive_is_not_shadowed() {
        assert_eq!(parse("弱阳性"), ParsedValue::new(Some(0.5), ValueFlag::TextPositive));
        assert_eq!(parse("阳性"), ParsedValue::new(Some(1.0), ValueFlag::TextPositive));
        assert_eq!(parse("+++"), ParsedValue::new(Some(1.0), ValueFlag::TextPositive));
    }

    #[test]
    fn negative_requires_exact_match() {
        assert_eq!(parse("阴性"), ParsedValue::new(Some(0.0), ValueFlag::TextNegative));
        assert_eq!(parse(" - "), ParsedValue::new(Some(0.0), ValueFlag::TextNegative));
        // Not exact: falls through to numeric parsing.
        assert_eq!(parse("-3"), ParsedValue::new(Some(-3.0), ValueFlag::Normal));
    }

    #[test]
    fn less_than_policies() {
        let half = ValueParser::default();
        assert_eq!(half.parse("<0.5").unwrap().numeric, Some(0.25));
        assert_eq!(half.parse("≤4").unwrap().numeric, Some(2.0));

        let lower = ValueParser::new(ParsingRules::default().with_less_than(LessThanPolicy::LowerBound));
        assert_eq!(lower.parse("<0.5").unwrap(), ParsedValue::new(Some(0.5), ValueFlag::LessThan));

        let na = ValueParser::new(ParsingRules::default().with_less_than(LessThanPolicy::Na));
        assert_eq!(na.parse("<0.5").unwrap(), ParsedValue::new(None, ValueFlag::LessThan));
    }

    #[test]
    fn greater_than_policies() {
        assert_eq!(parse(">1000"), ParsedValue::new(Some(1000.0), ValueFlag::GreaterThan));

        let cap = ValueParser::new(
            ParsingRules::default().with_greater_than(GreaterThanPolicy::Cap, Some(500.0)),
        );
        assert_eq!(cap.parse("≥1000").unwrap().numeric, Some(500.0));

        let cap_without_value =
            ValueParser::new(ParsingRules::default().with_greater_than(GreaterThanPolicy::Cap, None));
        assert_eq!(cap_without_value.parse(">1000").unwrap().numeric, Some(1000.0));

        let na = ValueParser::new(ParsingRules::default().with_greater_than(GreaterThanPolicy::Na, None));
        assert_eq!(na.parse(">1000").unwrap(), ParsedValue::new(None, ValueFlag::GreaterThan));
    }

    #[test]
    fn censored_without_magnitude_is_invalid() {
        let (rule, parsed) = ValueParser::default().classify("<abc").unwrap();
        assert_eq!(rule, None);
        assert_eq!(parsed, ParsedValue::invalid());
    }

    #[test]
    fn format_tags() {
        assert_eq!(parse("1.5e-3"), ParsedValue::new(Some(0.0015), ValueFlag::Scientific));
        assert_eq!(parse("10^3"), ParsedValue::new(Some(1000.0), ValueFlag::Power));
        assert_eq!(parse("1:128"), ParsedValue::new(Some(128.0), ValueFlag::Titer));
        assert_eq!(parse("1.5-2.0"), ParsedValue::new(Some(1.75), ValueFlag::Range));
    }

    #[test]
    fn plain_and_fallback_are_normal() {
        assert_eq!(parse("1,234.5"), ParsedValue::new(Some(1234.5), ValueFlag::Normal));
        assert_eq!(parse("5.6 mmol"), ParsedValue::new(Some(5.6), ValueFlag::Normal));
    }

    #[test]
    fn extreme_values_keep_their_number() {
        assert_eq!(parse("1e11"), ParsedValue::new(Some(1e11), ValueFlag::ExtremeValue));
        assert_eq!(parse("-20000000000"), ParsedValue::new(Some(-2e10), ValueFlag::ExtremeValue));
    }

    #[test]
    fn non_finite_is_invalid() {
        assert_eq!(parse("10^400"), ParsedValue::invalid());
        assert_eq!(parse("inf"), ParsedValue::invalid());
    }

    #[test]
    fn unparseable_text_is_invalid() {
        let (rule, parsed) = ValueParser::default().classify("见报告").unwrap();
        assert_eq!(rule, None);
        assert_eq!(parsed, ParsedValue::invalid());
    }

    #[test]
    fn blank_has_no_flag() {
        let parser = ValueParser::default();
        assert!(parser.parse("").is_none());
        assert!(parser.parse_cell(None).is_none());
        assert!(parser.parse_cell(Some("   ")).is_none());
    }

    #[test]
    fn custom_invalid_replacement_is_kept() {
        let rules = ParsingRules::default()
            .with_invalid_values(TextRule::new([("hemolyzed", Some(-1.0))]));
        let parsed = ValueParser::new(rules).parse("Hemolyzed sample").unwrap();
        assert_eq!(parsed, ParsedValue::new(Some(-1.0), ValueFlag::Invalid));
    }

    #[test]
    fn equal_length_tokens_keep_declaration_order() {
        let rules = ParsingRules::default()
            .with_positive_text(TextRule::new([("pos", Some(2.0)), ("ive", Some(3.0))]));
        let parsed = ValueParser::new(rules).parse("positive").unwrap();
        assert_eq!(parsed.numeric, Some(2.0));
    }
}
