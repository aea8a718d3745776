//! Shared utilities for the LIS extraction crates.
//!
//! This crate provides the Polars cell helpers every other crate uses to read
//! spreadsheet cells as text or numbers.

pub mod polars;

pub use polars::{
    any_to_f64, any_to_string, any_to_string_non_empty, column_f64, column_strings,
    format_numeric, has_column, parse_f64,
};
