//! Error types for value parsing and normalization.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors from column-level transformations.
///
/// Individual cells never produce errors: unparseable values are flagged
/// `invalid` in the output. Only structural problems surface here.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The column the transformation reads from is not in the frame.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
