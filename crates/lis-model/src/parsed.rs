//! Parsed result values.

use serde::{Deserialize, Serialize};

use crate::flag::ValueFlag;

/// Numeric interpretation of one raw result cell.
///
/// `numeric` is `None` for invalid or unparseable values and whenever a
/// policy maps the value to null. When present it is always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedValue {
    pub numeric: Option<f64>,
    pub flag: ValueFlag,
}

impl ParsedValue {
    pub fn new(numeric: Option<f64>, flag: ValueFlag) -> Self {
        Self { numeric, flag }
    }

    /// An unparseable value: no number, flagged `invalid`.
    pub fn invalid() -> Self {
        Self::new(None, ValueFlag::Invalid)
    }

    pub fn is_invalid(&self) -> bool {
        self.flag == ValueFlag::Invalid
    }
}
