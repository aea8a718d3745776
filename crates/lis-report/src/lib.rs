//! Data quality reporting for LIS extractions.
//!
//! [`QualityAnalyzer`] compares a run's raw export with its processed
//! long-format table and produces a [`QualityReport`]: row and column counts,
//! test and flag distributions, retention and parse-success rates, and the
//! warnings derived from them. The report renders as plain text and exports
//! to JSON and CSV.

mod analyzer;
mod error;
mod report;

pub use analyzer::{
    LOW_PARSE_SUCCESS_WARNING, LOW_RETENTION_WARNING, MIN_PARSE_SUCCESS_RATE, MIN_RETENTION_RATE,
    QualityAnalyzer, TIMESTAMP_FORMAT,
};
pub use error::{ReportError, Result};
pub use report::{ProcessedDataStats, QualityMetrics, QualityReport, RawDataStats};
