//! Quality metrics over one extraction run.
//!
//! The analyzer compares the raw concatenated export with the processed
//! long-format table. It never fails: absent columns simply contribute
//! nothing, and every ratio is defined as 0 when its denominator is empty.

use std::collections::{HashMap, HashSet};

use chrono::{Local, NaiveDateTime};
use lis_common::{column_strings, has_column};
use lis_model::OrderedMap;
use lis_model::fields::{TEST_CODE, VALUE_FLAG, VALUE_NUMERIC};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::report::{ProcessedDataStats, QualityMetrics, QualityReport, RawDataStats};

/// Retention below this ratio adds a warning.
pub const MIN_RETENTION_RATE: f64 = 0.5;

/// Parse success below this ratio adds a warning.
pub const MIN_PARSE_SUCCESS_RATE: f64 = 0.8;

pub const LOW_RETENTION_WARNING: &str =
    "data retention rate is below 50%; check that the profile matches the export";

pub const LOW_PARSE_SUCCESS_WARNING: &str =
    "value parse success rate is below 80%; the export may contain unhandled value formats";

/// Format of [`QualityReport::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builds [`QualityReport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyzes a run, stamping the report with the current local time.
    pub fn analyze(&self, raw: &DataFrame, processed: &DataFrame, profile: &str) -> QualityReport {
        self.analyze_at(raw, processed, profile, Local::now().naive_local())
    }

    /// Analyzes a run with an explicit report timestamp.
    pub fn analyze_at(
        &self,
        raw: &DataFrame,
        processed: &DataFrame,
        profile: &str,
        generated_at: NaiveDateTime,
    ) -> QualityReport {
        let raw_data = analyze_raw(raw);
        let processed_data = analyze_processed(processed);
        let quality_metrics = calculate_metrics(raw, processed);

        debug!(
            profile,
            raw_rows = raw_data.total_rows,
            processed_rows = processed_data.total_rows,
            warnings = quality_metrics.warnings.len(),
            "analyzed extraction quality"
        );

        QualityReport {
            profile: profile.to_string(),
            timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
            raw_data,
            processed_data,
            quality_metrics,
        }
    }
}

fn analyze_raw(df: &DataFrame) -> RawDataStats {
    RawDataStats {
        total_rows: df.height(),
        total_columns: df.width(),
        columns: column_names(df),
        missing_values: missing_values(df),
        duplicate_rows: duplicate_rows(df),
    }
}

fn analyze_processed(df: &DataFrame) -> ProcessedDataStats {
    if df.height() == 0 {
        return ProcessedDataStats::default();
    }

    let test_distribution = value_counts(df, TEST_CODE);
    ProcessedDataStats {
        total_rows: df.height(),
        total_tests: test_distribution.len(),
        test_distribution,
        value_flags: value_counts(df, VALUE_FLAG),
        missing_values: missing_values(df),
    }
}

fn calculate_metrics(raw: &DataFrame, processed: &DataFrame) -> QualityMetrics {
    let mut metrics = QualityMetrics {
        data_retention_rate: ratio(processed.height(), raw.height()),
        ..QualityMetrics::default()
    };

    if has_column(processed, VALUE_NUMERIC) {
        let non_null = processed
            .column(VALUE_NUMERIC)
            .map(|column| column.len() - column.null_count())
            .unwrap_or(0);
        metrics.value_parse_success_rate = ratio(non_null, processed.height());
    }

    if metrics.data_retention_rate < MIN_RETENTION_RATE {
        metrics.warnings.push(LOW_RETENTION_WARNING.to_string());
    }
    if metrics.value_parse_success_rate < MIN_PARSE_SUCCESS_RATE {
        metrics.warnings.push(LOW_PARSE_SUCCESS_WARNING.to_string());
    }
    metrics
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

fn read_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    column_strings(df, name).unwrap_or_else(|error| {
        warn!(column = name, %error, "column could not be read for the quality report");
        vec![None; df.height()]
    })
}

/// Null or blank cells per column, in column order.
fn missing_values(df: &DataFrame) -> OrderedMap<usize> {
    column_names(df)
        .into_iter()
        .map(|name| {
            let missing = read_column(df, &name)
                .iter()
                .filter(|cell| cell.is_none())
                .count();
            (name, missing)
        })
        .collect()
}

/// Rows identical to an earlier row.
fn duplicate_rows(df: &DataFrame) -> usize {
    let columns: Vec<Vec<Option<String>>> = column_names(df)
        .iter()
        .map(|name| read_column(df, name))
        .collect();

    let mut seen = HashSet::with_capacity(df.height());
    (0..df.height())
        .filter(|&row| {
            let key: Vec<Option<&str>> = columns
                .iter()
                .map(|column| column[row].as_deref())
                .collect();
            !seen.insert(key)
        })
        .count()
}

/// Non-null value counts, most frequent first; ties keep first-seen order.
fn value_counts(df: &DataFrame, name: &str) -> OrderedMap<usize> {
    if !has_column(df, name) {
        return OrderedMap::new();
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in read_column(df, name).into_iter().flatten() {
        match index.get(&value) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_counts_sort_by_count_then_first_seen() {
        let df = df! {
            "test_code" => [
                Some("AFP"),
                Some("CEA"),
                None,
                Some("WBC"),
                Some("CEA"),
                Some("AFP"),
                Some("CEA"),
            ],
        }
        .unwrap();

        let counts = value_counts(&df, "test_code");
        let entries: Vec<(&str, usize)> = counts
            .iter()
            .map(|(code, count)| (code, *count))
            .collect();
        assert_eq!(entries, [("CEA", 3), ("AFP", 2), ("WBC", 1)]);
        assert!(value_counts(&df, "value_flag").is_empty());
    }

    #[test]
    fn value_counts_scale_with_distinct_values() {
        let codes: Vec<String> = (0..5_000).map(|row| format!("T{}", row % 2_500)).collect();
        let df = df! { "test_code" => codes }.unwrap();

        let counts = value_counts(&df, "test_code");
        assert_eq!(counts.len(), 2_500);
        assert_eq!(counts.get("T0"), Some(&2));
        assert_eq!(counts.keys().next(), Some("T0"));
    }

    fn raw_frame() -> DataFrame {
        df! {
            "病人ID" => [Some("P1"), Some("P1"), Some("P2"), Some("P3")],
            "项目" => [Some("CEA"), Some("CEA"), Some("AFP"), None],
            "结果" => [Some("1.5"), Some("1.5"), Some("阳性"), Some("")],
        }
        .unwrap()
    }

    fn processed_frame() -> DataFrame {
        df! {
            "test_code" => ["CEA", "CEA", "AFP"],
            "value_numeric" => [Some(1.5), Some(1.5), None],
            "value_flag" => ["normal", "normal", "invalid"],
        }
        .unwrap()
    }

    #[test]
    fn test_raw_stats() {
        let stats = analyze_raw(&raw_frame());
        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.total_columns, 3);
        assert_eq!(stats.columns, ["病人ID", "项目", "结果"]);
        assert_eq!(stats.duplicate_rows, 1);
        assert_eq!(stats.missing_values.get("项目"), Some(&1));
        assert_eq!(stats.missing_values.get("结果"), Some(&1));
        assert_eq!(stats.missing_values.get("病人ID"), Some(&0));
    }

    #[test]
    fn test_processed_distributions() {
        let stats = analyze_processed(&processed_frame());
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.total_tests, 2);
        let tests: Vec<(&str, usize)> = stats
            .test_distribution
            .iter()
            .map(|(code, count)| (code, *count))
            .collect();
        assert_eq!(tests, [("CEA", 2), ("AFP", 1)]);
        assert_eq!(stats.value_flags.get("invalid"), Some(&1));
        assert_eq!(stats.missing_values.get("value_numeric"), Some(&1));
    }

    #[test]
    fn test_metrics_and_warnings() {
        let metrics = calculate_metrics(&raw_frame(), &processed_frame());
        assert_eq!(metrics.data_retention_rate, 0.75);
        assert!((metrics.value_parse_success_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.warnings, [LOW_PARSE_SUCCESS_WARNING]);
    }

    #[test]
    fn test_empty_frames_have_zero_rates() {
        let empty = DataFrame::empty();
        let metrics = calculate_metrics(&empty, &empty);
        assert_eq!(metrics.data_retention_rate, 0.0);
        assert_eq!(metrics.value_parse_success_rate, 0.0);
        assert_eq!(
            metrics.warnings,
            [LOW_RETENTION_WARNING, LOW_PARSE_SUCCESS_WARNING]
        );

        let stats = analyze_processed(&empty);
        assert_eq!(stats, ProcessedDataStats::default());
    }

    #[test]
    fn test_missing_value_column_counts_as_unparsed() {
        let processed = df! { "test_code" => ["CEA"] }.unwrap();
        let metrics = calculate_metrics(&raw_frame(), &processed);
        assert_eq!(metrics.value_parse_success_rate, 0.0);
    }
}
