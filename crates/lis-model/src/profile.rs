//! LIS profile: the reusable declarative mapping for one hospital's export format.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ordered::OrderedMap;
use crate::rules::ParsingRules;

pub const DEFAULT_MIN_MATCH_RATIO: f64 = 0.75;

/// Reference interval `[low, high]` for a canonical test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
}

impl ReferenceRange {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if low > high {
            return Err(ModelError::InvalidRange {
                low: low.to_string(),
                high: high.to_string(),
            });
        }
        Ok(Self { low, high })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

impl From<[f64; 2]> for ReferenceRange {
    fn from(value: [f64; 2]) -> Self {
        Self {
            low: value[0],
            high: value[1],
        }
    }
}

impl From<ReferenceRange> for [f64; 2] {
    fn from(value: ReferenceRange) -> Self {
        [value.low, value.high]
    }
}

/// Aliases, unit and reference range for one canonical test code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestDefinition {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub range: Option<ReferenceRange>,
}

impl TestDefinition {
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
            unit: None,
            range: None,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: ReferenceRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Header signature used to recognise files produced by the same LIS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSignature {
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default = "default_min_match_ratio")]
    pub min_match_ratio: f64,
    /// Banner rows above the header row.
    #[serde(default)]
    pub skip_top_rows: usize,
}

fn default_min_match_ratio() -> f64 {
    DEFAULT_MIN_MATCH_RATIO
}

impl Default for ProfileSignature {
    fn default() -> Self {
        Self {
            required_columns: Vec::new(),
            min_match_ratio: DEFAULT_MIN_MATCH_RATIO,
            skip_top_rows: 0,
        }
    }
}

impl ProfileSignature {
    /// Fraction of `required_columns` found among `columns` (trimmed, exact).
    ///
    /// An empty signature matches everything.
    pub fn match_ratio<S: AsRef<str>>(&self, columns: &[S]) -> f64 {
        if self.required_columns.is_empty() {
            return 1.0;
        }
        let found = self
            .required_columns
            .iter()
            .filter(|required| {
                columns
                    .iter()
                    .any(|column| column.as_ref().trim() == required.trim())
            })
            .count();
        found as f64 / self.required_columns.len() as f64
    }

    pub fn matches<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        self.match_ratio(columns) >= self.min_match_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Drop rows whose test code is not in `test_mapping`.
    #[serde(default = "default_true")]
    pub drop_unknown_tests: bool,
    /// Drop rows whose result did not yield a numeric value.
    #[serde(default)]
    pub drop_failed_rows: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            drop_unknown_tests: true,
            drop_failed_rows: false,
        }
    }
}

/// A complete extraction profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub signature: ProfileSignature,
    /// Standard field → original column name.
    #[serde(default)]
    pub column_mapping: OrderedMap<String>,
    /// Canonical test code → definition, in declaration order.
    #[serde(default)]
    pub test_mapping: OrderedMap<TestDefinition>,
    #[serde(default)]
    pub value_parsing: ParsingRules,
    #[serde(default)]
    pub output_options: OutputOptions,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            created_at: None,
            signature: ProfileSignature::default(),
            column_mapping: OrderedMap::new(),
            test_mapping: OrderedMap::new(),
            value_parsing: ParsingRules::default(),
            output_options: OutputOptions::default(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Canonical codes selected for extraction, in declaration order.
    pub fn selected_tests(&self) -> Vec<String> {
        self.test_mapping.keys().map(str::to_string).collect()
    }
}
