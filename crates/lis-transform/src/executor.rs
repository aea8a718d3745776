//! Column-level application of the value parser and datetime normalization.
//!
//! Each function reads one column, writes its output columns back into the
//! frame and returns counts for logging. Row count and order never change.

use std::collections::BTreeMap;

use lis_common::{column_strings, has_column};
use lis_model::ValueFlag;
use lis_model::fields::{VALUE_FLAG, VALUE_NUMERIC};
use polars::prelude::*;
use tracing::{debug, error, warn};

use crate::error::{Result, TransformError};
use crate::normalization::datetime::normalize_datetime;
use crate::parser::ValueParser;

/// Failure ratio above which datetime normalization logs a high-failure warning.
pub const DATETIME_FAILURE_WARN_RATIO: f64 = 0.5;

/// Non-empty values needed before the failure ratio is considered meaningful.
pub const DATETIME_FAILURE_MIN_VALUES: usize = 10;

/// Outcome of [`apply_value_parsing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub rows: usize,
    /// Rows whose cell was null or blank (no flag).
    pub blank: usize,
    /// Rows that ended with a numeric value.
    pub numeric: usize,
    /// Rows flagged `invalid`.
    pub invalid: usize,
    pub flags: BTreeMap<ValueFlag, usize>,
}

/// Outcome of [`normalize_datetime_column`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatetimeSummary {
    /// Non-empty values before normalization.
    pub original: usize,
    /// Values that parsed.
    pub parsed: usize,
}

impl DatetimeSummary {
    pub fn failed(&self) -> usize {
        self.original - self.parsed
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.original == 0 {
            0.0
        } else {
            self.failed() as f64 / self.original as f64
        }
    }
}

fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(TransformError::ColumnNotFound {
            column: name.to_string(),
        })
    }
}

/// Parses every cell of `value_col` and appends `value_numeric` and `value_flag`.
///
/// Blank cells get null in both columns. Existing output columns are replaced.
pub fn apply_value_parsing(
    df: &mut DataFrame,
    value_col: &str,
    parser: &ValueParser,
) -> Result<ParseSummary> {
    require_column(df, value_col)?;
    let cells = column_strings(df, value_col)?;

    let mut summary = ParseSummary {
        rows: cells.len(),
        ..ParseSummary::default()
    };
    let mut numerics: Vec<Option<f64>> = Vec::with_capacity(cells.len());
    let mut flags: Vec<Option<&'static str>> = Vec::with_capacity(cells.len());

    for cell in &cells {
        match parser.parse_cell(cell.as_deref()) {
            Some(parsed) => {
                if parsed.numeric.is_some() {
                    summary.numeric += 1;
                }
                if parsed.is_invalid() {
                    summary.invalid += 1;
                }
                *summary.flags.entry(parsed.flag).or_insert(0) += 1;
                numerics.push(parsed.numeric);
                flags.push(Some(parsed.flag.as_str()));
            }
            None => {
                summary.blank += 1;
                numerics.push(None);
                flags.push(None);
            }
        }
    }

    df.with_column(Series::new(VALUE_NUMERIC.into(), numerics))?;
    df.with_column(Series::new(VALUE_FLAG.into(), flags))?;

    debug!(
        column = value_col,
        rows = summary.rows,
        numeric = summary.numeric,
        invalid = summary.invalid,
        blank = summary.blank,
        "parsed result values"
    );
    Ok(summary)
}

/// Rewrites `column` as `YYYY-MM-DD HH:MM:SS` strings; unparseable values become null.
///
/// Logs a warning when any value fails. When every value fails an error is
/// logged; otherwise a failure ratio above [`DATETIME_FAILURE_WARN_RATIO`]
/// over more than [`DATETIME_FAILURE_MIN_VALUES`] values adds a warning.
pub fn normalize_datetime_column(df: &mut DataFrame, column: &str) -> Result<DatetimeSummary> {
    require_column(df, column)?;
    let cells = column_strings(df, column)?;

    let mut summary = DatetimeSummary::default();
    let normalized: Vec<Option<String>> = cells
        .iter()
        .map(|cell| {
            let value = cell.as_deref()?;
            summary.original += 1;
            let normalized = normalize_datetime(value);
            if normalized.is_some() {
                summary.parsed += 1;
            }
            normalized
        })
        .collect();

    df.with_column(Series::new(column.into(), normalized))?;

    if summary.failed() > 0 {
        warn!(
            column,
            original = summary.original,
            parsed = summary.parsed,
            failed = summary.failed(),
            "some date/time values could not be parsed and were set to null"
        );
        if summary.parsed == 0 {
            error!(column, "no date/time value could be parsed; check the source date format");
        } else if summary.original > DATETIME_FAILURE_MIN_VALUES
            && summary.failure_ratio() > DATETIME_FAILURE_WARN_RATIO
        {
            warn!(
                column,
                failure_ratio = summary.failure_ratio(),
                "high date/time parse failure rate; check the source date format"
            );
        }
    }
    Ok(summary)
}
