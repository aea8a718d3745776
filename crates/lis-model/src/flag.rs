//! Result interpretation flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// How a raw result string was interpreted by the value parser.
///
/// This is a closed set: every parsed, non-blank cell carries exactly one of
/// these flags. Blank cells carry no flag at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFlag {
    /// Plain number, including values recovered by substring extraction.
    Normal,
    /// Censored below a detection limit (`<0.5`, `≤5`).
    LessThan,
    /// Censored above a reportable limit (`>1000`, `≥10`).
    GreaterThan,
    /// Scientific notation (`1.5e-3`).
    Scientific,
    /// Exponent form (`10^3`).
    Power,
    /// Serial dilution (`1:128`).
    Titer,
    /// Interval (`1.5-2.0`), reported as its midpoint.
    Range,
    /// Matched a configured positive token.
    TextPositive,
    /// Matched a configured negative token.
    TextNegative,
    /// Invalid sample or unparseable text.
    Invalid,
    /// Finite value whose magnitude exceeds the extreme-value threshold.
    ExtremeValue,
}

impl ValueFlag {
    /// All flags, in declaration order.
    pub const ALL: [ValueFlag; 11] = [
        ValueFlag::Normal,
        ValueFlag::LessThan,
        ValueFlag::GreaterThan,
        ValueFlag::Scientific,
        ValueFlag::Power,
        ValueFlag::Titer,
        ValueFlag::Range,
        ValueFlag::TextPositive,
        ValueFlag::TextNegative,
        ValueFlag::Invalid,
        ValueFlag::ExtremeValue,
    ];

    /// Returns the column value written to the flag column.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueFlag::Normal => "normal",
            ValueFlag::LessThan => "less_than",
            ValueFlag::GreaterThan => "greater_than",
            ValueFlag::Scientific => "scientific",
            ValueFlag::Power => "power",
            ValueFlag::Titer => "titer",
            ValueFlag::Range => "range",
            ValueFlag::TextPositive => "text_positive",
            ValueFlag::TextNegative => "text_negative",
            ValueFlag::Invalid => "invalid",
            ValueFlag::ExtremeValue => "extreme_value",
        }
    }

    /// True for flags describing a censored (threshold-only) result.
    pub fn is_censored(self) -> bool {
        matches!(self, ValueFlag::LessThan | ValueFlag::GreaterThan)
    }

    /// True for flags produced by the text token tables.
    pub fn is_text(self) -> bool {
        matches!(self, ValueFlag::TextPositive | ValueFlag::TextNegative)
    }
}

impl fmt::Display for ValueFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueFlag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ValueFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ModelError::UnknownFlag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for flag in ValueFlag::ALL {
            assert_eq!(flag.as_str().parse::<ValueFlag>().unwrap(), flag);
        }
    }

    #[test]
    fn rejects_unknown_flag() {
        let err = "approximate".parse::<ValueFlag>().unwrap_err();
        assert_eq!(err, ModelError::UnknownFlag("approximate".to_string()));
    }

    #[test]
    fn groups_censored_and_text_flags() {
        let censored: Vec<ValueFlag> = ValueFlag::ALL
            .into_iter()
            .filter(|flag| flag.is_censored())
            .collect();
        assert_eq!(censored, [ValueFlag::LessThan, ValueFlag::GreaterThan]);

        let text: Vec<ValueFlag> = ValueFlag::ALL
            .into_iter()
            .filter(|flag| flag.is_text())
            .collect();
        assert_eq!(text, [ValueFlag::TextPositive, ValueFlag::TextNegative]);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ValueFlag::ExtremeValue).unwrap();
        assert_eq!(json, "\"extreme_value\"");
    }
}
