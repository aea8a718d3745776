//! Value parsing rules.
//!
//! A `ParsingRules` value is built once per extraction run from the profile's
//! `value_parsing` block and is never mutated during the run. Missing blocks
//! fall back to [`ParsingRules::default`].

use serde::{Deserialize, Serialize};

use crate::ordered::OrderedMap;

/// Magnitude above which a finite result is flagged `extreme_value`.
pub const DEFAULT_EXTREME_VALUE_THRESHOLD: f64 = 1e10;

/// Replacement values keyed by the text token that triggers them.
pub type TokenMap = OrderedMap<Option<f64>>;

/// Policy for results censored below a limit (`<0.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessThanPolicy {
    /// Report half of the limit.
    #[default]
    Half,
    /// Report the limit itself.
    LowerBound,
    /// Report no numeric value.
    Na,
}

/// Policy for results censored above a limit (`>1000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreaterThanPolicy {
    /// Report the limit itself.
    #[default]
    Keep,
    /// Report the configured cap value.
    Cap,
    /// Report no numeric value.
    Na,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LessThanRule {
    #[serde(default)]
    pub rule: LessThanPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GreaterThanRule {
    #[serde(default)]
    pub rule: GreaterThanPolicy,
    /// Used by [`GreaterThanPolicy::Cap`]; the extracted limit is reported when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_value: Option<f64>,
}

/// A token table: text → numeric replacement (or null).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextRule {
    #[serde(default)]
    pub mapping: TokenMap,
}

impl TextRule {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<f64>)>,
        K: Into<String>,
    {
        Self {
            mapping: entries.into_iter().collect(),
        }
    }
}

/// The five independently configurable parsing policies plus the
/// extreme-value threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingRules {
    pub less_than: LessThanRule,
    pub greater_than: GreaterThanRule,
    pub positive_text: TextRule,
    pub negative_text: TextRule,
    pub invalid_values: TextRule,
    pub extreme_value_threshold: f64,
}

impl Default for ParsingRules {
    /// The rules used when a profile does not configure value parsing:
    ///
    /// - `<x` reports `x / 2`; `>x` reports `x`.
    /// - Positive tokens: `阳性` → 1, `弱阳性` → 0.5, `+`/`++`/`+++` → 1.
    /// - Negative tokens: `阴性` → 0, `-` → 0.
    /// - Invalid tokens (all → null): `溶血` (hemolyzed), `样本不足`
    ///   (insufficient sample), `标本凝集` (clotted), `未检出` (not
    ///   detected), `--`, `/`, `#`, `NA`, `N/A`.
    /// - Extreme-value threshold `1e10`.
    fn default() -> Self {
        Self {
            less_than: LessThanRule::default(),
            greater_than: GreaterThanRule::default(),
            positive_text: TextRule::new([
                ("阳性", Some(1.0)),
                ("弱阳性", Some(0.5)),
                ("+", Some(1.0)),
                ("++", Some(1.0)),
                ("+++", Some(1.0)),
            ]),
            negative_text: TextRule::new([("阴性", Some(0.0)), ("-", Some(0.0))]),
            invalid_values: TextRule::new([
                ("溶血", None),
                ("样本不足", None),
                ("标本凝集", None),
                ("未检出", None),
                ("--", None),
                ("/", None),
                ("#", None),
                ("NA", None),
                ("N/A", None),
            ]),
            extreme_value_threshold: DEFAULT_EXTREME_VALUE_THRESHOLD,
        }
    }
}

impl ParsingRules {
    #[must_use]
    pub fn with_less_than(mut self, rule: LessThanPolicy) -> Self {
        self.less_than.rule = rule;
        self
    }

    #[must_use]
    pub fn with_greater_than(mut self, rule: GreaterThanPolicy, cap_value: Option<f64>) -> Self {
        self.greater_than = GreaterThanRule { rule, cap_value };
        self
    }

    #[must_use]
    pub fn with_positive_text(mut self, rule: TextRule) -> Self {
        self.positive_text = rule;
        self
    }

    #[must_use]
    pub fn with_negative_text(mut self, rule: TextRule) -> Self {
        self.negative_text = rule;
        self
    }

    #[must_use]
    pub fn with_invalid_values(mut self, rule: TextRule) -> Self {
        self.invalid_values = rule;
        self
    }

    #[must_use]
    pub fn with_extreme_value_threshold(mut self, threshold: f64) -> Self {
        self.extreme_value_threshold = threshold;
        self
    }
}
