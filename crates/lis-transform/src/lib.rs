//! Result value parsing and normalization for LIS extractions.
//!
//! # Overview
//!
//! This crate provides:
//! - **Numeric extraction**: recover a number from clinical result strings
//!   (`"1:128"`, `"1.5-2.0"`, `"10^3"`, `"<0.5"`)
//! - **Value parsing**: classify a result into a numeric value plus a
//!   [`ValueFlag`](lis_model::ValueFlag) under configurable [`ParsingRules`](lis_model::ParsingRules)
//! - **Format detection**: survey a column's value formats while authoring a profile
//! - **Column execution**: apply parsing and datetime normalization to a `DataFrame`
//!
//! # Example
//!
//! ```
//! use lis_model::{ParsingRules, ValueFlag};
//! use lis_transform::ValueParser;
//!
//! let parser = ValueParser::new(ParsingRules::default());
//! let parsed = parser.parse("弱阳性").unwrap();
//! assert_eq!(parsed.numeric, Some(0.5));
//! assert_eq!(parsed.flag, ValueFlag::TextPositive);
//! ```

mod error;
mod executor;
mod formats;
mod parser;

pub mod normalization;

pub use error::{Result, TransformError};

pub use executor::{
    DATETIME_FAILURE_MIN_VALUES, DATETIME_FAILURE_WARN_RATIO, DatetimeSummary, ParseSummary,
    apply_value_parsing, normalize_datetime_column,
};
pub use formats::{
    DEFAULT_MAX_SAMPLES, DETECTED_FORMATS, FormatStats, FormatSummary, SAMPLES_PER_FORMAT,
    SpecialValuePatterns, detect_format, detect_special_value_patterns, detect_value_formats,
};
pub use normalization::{extract_numeric, parse_datetime};
pub use parser::{RULE_ORDER, RuleKind, ValueParser};
