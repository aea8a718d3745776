//! The quality report and its exporters.

use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

use lis_model::OrderedMap;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{ReportError, Result};

const RULE: &str = "============================================================";

/// Statistics of the raw concatenated export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawDataStats {
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
    /// Null or blank cells per column.
    pub missing_values: OrderedMap<usize>,
    pub duplicate_rows: usize,
}

/// Statistics of the processed long-format table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessedDataStats {
    pub total_rows: usize,
    /// Distinct test codes.
    pub total_tests: usize,
    pub test_distribution: OrderedMap<usize>,
    pub value_flags: OrderedMap<usize>,
    pub missing_values: OrderedMap<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub data_retention_rate: f64,
    pub value_parse_success_rate: f64,
    pub warnings: Vec<String>,
}

/// Quality summary of one extraction run.
///
/// Built by [`QualityAnalyzer`](crate::QualityAnalyzer); afterwards only
/// [`add_warning`](Self::add_warning) changes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub(crate) profile: String,
    pub(crate) timestamp: String,
    pub(crate) raw_data: RawDataStats,
    pub(crate) processed_data: ProcessedDataStats,
    pub(crate) quality_metrics: QualityMetrics,
}

impl QualityReport {
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn raw_data(&self) -> &RawDataStats {
        &self.raw_data
    }

    pub fn processed_data(&self) -> &ProcessedDataStats {
        &self.processed_data
    }

    pub fn metrics(&self) -> &QualityMetrics {
        &self.quality_metrics
    }

    pub fn warnings(&self) -> &[String] {
        &self.quality_metrics.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.quality_metrics.warnings.is_empty()
    }

    /// Appends a caller-supplied warning, e.g. about tests dropped by the selection.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.quality_metrics.warnings.push(warning.into());
    }

    /// Renders the fixed plain-text summary.
    pub fn summary_text(&self) -> String {
        let raw = &self.raw_data;
        let processed = &self.processed_data;
        let metrics = &self.quality_metrics;

        let mut out = String::new();
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "LIS Extraction Quality Report");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "Profile: {}", self.profile);
        let _ = writeln!(out, "Generated: {}", self.timestamp);
        let _ = writeln!(out);
        let _ = writeln!(out, "[Raw data]");
        let _ = writeln!(out, "  Rows: {}", raw.total_rows);
        let _ = writeln!(out, "  Columns: {}", raw.total_columns);
        let _ = writeln!(out, "  Duplicate rows: {}", raw.duplicate_rows);
        let _ = writeln!(out);
        let _ = writeln!(out, "[Processed data]");
        let _ = writeln!(out, "  Rows: {}", processed.total_rows);
        let _ = writeln!(out, "  Tests: {}", processed.total_tests);
        let _ = writeln!(out);
        let _ = writeln!(out, "[Quality metrics]");
        let _ = writeln!(out, "  Retention rate: {}", percent(metrics.data_retention_rate));
        let _ = writeln!(
            out,
            "  Parse success rate: {}",
            percent(metrics.value_parse_success_rate)
        );
        if !metrics.warnings.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "[Warnings]");
            for warning in &metrics.warnings {
                let _ = writeln!(out, "  ! {warning}");
            }
        }
        out.push_str(RULE);
        out
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "wrote quality report");
        Ok(())
    }

    /// Writes the headline numbers and both distributions as one CSV.
    ///
    /// Columns are `section`, `item` and `value`. Sections are `summary`,
    /// `test_distribution` and `value_flags`.
    pub fn write_distribution_csv(&self, path: &Path) -> Result<()> {
        let mut df = self.distribution_frame()?;
        let mut file = File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        info!(path = %path.display(), rows = df.height(), "wrote quality distributions");
        Ok(())
    }

    fn distribution_frame(&self) -> Result<DataFrame> {
        let mut sections: Vec<&str> = Vec::new();
        let mut items: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();
        let mut push = |section: &'static str, item: &str, value: String| {
            sections.push(section);
            items.push(item.to_string());
            values.push(value);
        };

        let metrics = &self.quality_metrics;
        push("summary", "raw_rows", self.raw_data.total_rows.to_string());
        push("summary", "processed_rows", self.processed_data.total_rows.to_string());
        push("summary", "total_tests", self.processed_data.total_tests.to_string());
        push("summary", "data_retention_rate", percent(metrics.data_retention_rate));
        push(
            "summary",
            "value_parse_success_rate",
            percent(metrics.value_parse_success_rate),
        );
        for (code, count) in self.processed_data.test_distribution.iter() {
            push("test_distribution", code, count.to_string());
        }
        for (flag, count) in self.processed_data.value_flags.iter() {
            push("value_flags", flag, count.to_string());
        }

        Ok(DataFrame::new(vec![
            Series::new("section".into(), sections).into_column(),
            Series::new("item".into(), items).into_column(),
            Series::new("value".into(), values).into_column(),
        ])?)
    }
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> QualityReport {
        QualityReport {
            profile: "example_hospital_lis".to_string(),
            timestamp: "2024-03-01 09:30:00".to_string(),
            raw_data: RawDataStats {
                total_rows: 4,
                total_columns: 3,
                columns: vec!["a".into(), "b".into(), "c".into()],
                missing_values: OrderedMap::new(),
                duplicate_rows: 1,
            },
            processed_data: ProcessedDataStats {
                total_rows: 3,
                total_tests: 2,
                test_distribution: [("CEA", 2), ("AFP", 1)].into_iter().collect(),
                value_flags: [("normal", 2), ("invalid", 1)].into_iter().collect(),
                missing_values: OrderedMap::new(),
            },
            quality_metrics: QualityMetrics {
                data_retention_rate: 0.75,
                value_parse_success_rate: 2.0 / 3.0,
                warnings: vec!["value parse success rate is below 80%".to_string()],
            },
        }
    }

    #[test]
    fn test_summary_text() {
        insta::assert_snapshot!(sample_report().summary_text(), @r"
        ============================================================
        LIS Extraction Quality Report
        ============================================================
        Profile: example_hospital_lis
        Generated: 2024-03-01 09:30:00

        [Raw data]
          Rows: 4
          Columns: 3
          Duplicate rows: 1

        [Processed data]
          Rows: 3
          Tests: 2

        [Quality metrics]
          Retention rate: 75.00%
          Parse success rate: 66.67%

        [Warnings]
          ! value parse success rate is below 80%
        ============================================================
        ");
    }

    #[test]
    fn test_summary_without_warnings_has_no_section() {
        let mut report = sample_report();
        report.quality_metrics.warnings.clear();
        assert!(!report.summary_text().contains("[Warnings]"));
    }

    #[test]
    fn test_add_warning() {
        let mut report = sample_report();
        report.add_warning("3 tests were not selected");
        assert_eq!(report.warnings().len(), 2);
        assert!(report.summary_text().contains("  ! 3 tests were not selected"));
    }

    #[test]
    fn test_distribution_frame() {
        let df = sample_report().distribution_frame().unwrap();
        assert_eq!(df.height(), 9);
        let items = df.column("item").unwrap().str().unwrap();
        assert_eq!(items.get(5), Some("CEA"));
        assert_eq!(items.get(8), Some("invalid"));
    }
}
