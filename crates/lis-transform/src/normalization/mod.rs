//! Normalization functions for raw LIS cells.
//!
//! - **numeric**: numeric extraction from free-form result strings
//! - **datetime**: sample date/time parsing and formatting

pub mod datetime;
pub mod numeric;

pub use datetime::{NORMALIZED_DATETIME_FORMAT, normalize_datetime, parse_datetime};
pub use numeric::{
    extract_numeric, fold_fullwidth_digits, parse_plain_number, strip_thousands_separators,
};
