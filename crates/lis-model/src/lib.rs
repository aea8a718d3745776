//! Data model for LIS laboratory result extraction.
//!
//! - **flag**: the closed set of result interpretation flags
//! - **parsed**: a parsed result (numeric value + flag)
//! - **rules**: value parsing policies and token tables
//! - **profile**: the declarative per-LIS extraction profile
//! - **fields**: standard output field names

pub mod error;
pub mod fields;
pub mod flag;
pub mod ordered;
pub mod parsed;
pub mod profile;
pub mod rules;

pub use error::{ModelError, Result};
pub use flag::ValueFlag;
pub use ordered::OrderedMap;
pub use parsed::ParsedValue;
pub use profile::{
    DEFAULT_MIN_MATCH_RATIO, OutputOptions, Profile, ProfileSignature, ReferenceRange,
    TestDefinition,
};
pub use rules::{
    DEFAULT_EXTREME_VALUE_THRESHOLD, GreaterThanPolicy, GreaterThanRule, LessThanPolicy,
    LessThanRule, ParsingRules, TextRule, TokenMap,
};
