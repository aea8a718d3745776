//! Extraction pipeline with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Discover**: resolve the input file or folder to CSV exports
//! 2. **Load**: read each export, skipping unreadable files
//! 3. **Combine**: stack all exports into one raw table
//! 4. **Map**: rename source columns to standard fields
//! 5. **Standardize**: resolve test names to canonical codes, filter unselected tests
//! 6. **Parse**: split result strings into `value_numeric` and `value_flag`
//! 7. **Datetimes**: normalize `sample_datetime`
//! 8. **Output**: project `labs_long` and build the quality report
//! 9. **Export**: write `labs_long_<run_id>.csv` and `qc_report_<run_id>.json`
//!
//! Progress is reported and cancellation is checked between stages.
//! Cancelling never leaves partial outputs: files are only written in the
//! last stage, after the final check.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use lis_common::{column_strings, has_column};
use lis_ingest::{IngestError, concat_frames, discover_inputs, read_csv_table};
use lis_map::{ColumnMapper, TestAliasTable, filter_selected};
use lis_model::Profile;
use lis_model::fields::{
    LABS_LONG_COLUMNS, PASSTHROUGH_PREFIX, PROFILE_ID, RUN_ID, SAMPLE_DATETIME, TEST_CODE,
    TEST_NAME, TEST_VALUE, VALUE_NUMERIC,
};
use lis_report::{QualityAnalyzer, QualityReport};
use lis_transform::{
    DatetimeSummary, ParseSummary, ValueParser, apply_value_parsing, normalize_datetime_column,
};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::logging::redact_value;

/// Format of run ids, which also stamp output file names.
pub const RUN_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Unselected test names listed individually in the warning.
pub const MAX_LISTED_TESTS: usize = 10;

const MAX_DATETIME_SAMPLES: usize = 5;

/// Returned when a run is cancelled between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("extraction cancelled")]
pub struct Cancelled;

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn check(&self) -> std::result::Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receives coarse progress between stages.
pub trait ProgressSink {
    fn progress(&self, percent: u8, message: &str);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _percent: u8, _message: &str) {}
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub output_dir: PathBuf,
    /// Run every stage but write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Files written by the export stage.
#[derive(Debug, Clone)]
pub struct OutputFiles {
    pub labs_long: PathBuf,
    /// `None` when the report could not be written; the run still succeeds.
    pub qc_report: Option<PathBuf>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct ExtractionResult {
    pub run_id: String,
    pub profile_id: String,
    pub loaded_files: Vec<LoadedFile>,
    pub skipped_files: Vec<SkippedFile>,
    pub raw_rows: usize,
    /// Canonical codes found in the data but not selected by the profile.
    pub unselected_tests: BTreeSet<String>,
    pub dropped_unknown_rows: usize,
    pub dropped_failed_rows: usize,
    pub parse: ParseSummary,
    pub datetime: Option<DatetimeSummary>,
    pub labs_long: DataFrame,
    pub report: QualityReport,
    pub outputs: Option<OutputFiles>,
}

/// Output of the discover and load stages.
#[derive(Debug)]
pub struct LoadedInputs {
    pub frame: DataFrame,
    pub files: Vec<LoadedFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Output of the standardize stage.
#[derive(Debug)]
pub struct StandardizedTests {
    pub frame: DataFrame,
    pub unselected: BTreeSet<String>,
    pub dropped_rows: usize,
}

/// Runs a profile over `input`.
pub fn run_extraction(
    input: &Path,
    profile: &Profile,
    options: &ExtractOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ExtractionResult> {
    let run_id = Local::now().format(RUN_ID_FORMAT).to_string();
    let span = info_span!("extract", profile = %profile.id, run_id = %run_id);
    let _guard = span.enter();
    let started = Instant::now();

    progress.progress(0, "starting");
    cancel.check()?;

    // Stages 1-3: discover, load, combine
    let LoadedInputs {
        frame: raw,
        files: loaded_files,
        skipped: skipped_files,
    } = load_inputs(input, profile.signature.skip_top_rows, progress, cancel)?;
    progress.progress(45, &format!("combined {} rows", raw.height()));
    check_signature(profile, &raw);
    cancel.check()?;

    // Stage 4: column mapping
    progress.progress(46, "mapping columns");
    let mapped = map_columns(profile, &raw)?;
    progress.progress(50, "columns mapped");
    cancel.check()?;

    // Stage 5: test standardization and selection
    progress.progress(60, "standardizing tests");
    let StandardizedTests {
        frame: mut standardized,
        unselected: unselected_tests,
        dropped_rows: dropped_unknown_rows,
    } = standardize_tests(profile, mapped)?;
    cancel.check()?;

    // Stage 6: value parsing
    progress.progress(65, &format!("parsing {} values", standardized.height()));
    let parser = ValueParser::new(profile.value_parsing.clone());
    let parse = apply_value_parsing(&mut standardized, TEST_VALUE, &parser)
        .context("parse result values")?;
    let (mut parsed, dropped_failed_rows) = if profile.output_options.drop_failed_rows {
        drop_failed_rows(&standardized)?
    } else {
        (standardized, 0)
    };
    progress.progress(72, "values parsed");
    cancel.check()?;

    // Stage 7: datetimes
    progress.progress(74, "normalizing datetimes");
    let datetime = normalize_datetimes(&mut parsed)?;
    cancel.check()?;

    // Stage 8: labs_long and quality report
    progress.progress(80, "building labs_long");
    let labs_long = build_labs_long(&parsed, &profile.id, &run_id)?;
    progress.progress(85, "analyzing quality");
    let mut report = QualityAnalyzer::new().analyze(&raw, &labs_long, &profile.id);
    if !unselected_tests.is_empty() {
        report.add_warning(format!(
            "{} tests found in the data are not selected by the profile",
            unselected_tests.len()
        ));
    }
    cancel.check()?;

    // Stage 9: export
    let outputs = if options.dry_run {
        info!("dry run: skipping output files");
        None
    } else {
        progress.progress(90, "exporting");
        Some(export_outputs(&labs_long, &report, &options.output_dir, &run_id)?)
    };

    progress.progress(100, "done");
    info!(
        rows = labs_long.height(),
        tests = profile.test_mapping.len(),
        duration_ms = started.elapsed().as_millis(),
        "extraction complete"
    );

    Ok(ExtractionResult {
        run_id,
        profile_id: profile.id.clone(),
        loaded_files,
        skipped_files,
        raw_rows: raw.height(),
        unselected_tests,
        dropped_unknown_rows,
        dropped_failed_rows,
        parse,
        datetime,
        labs_long,
        report,
        outputs,
    })
}

// ============================================================================
// Stages 1-3: Discover, Load, Combine
// ============================================================================

/// Discovers and loads every export under `input` into one raw table.
///
/// Files that fail to load are skipped with a warning; the stage fails only
/// when none can be read.
pub fn load_inputs(
    input: &Path,
    skip_top_rows: usize,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<LoadedInputs> {
    let paths = discover_inputs(input).context("discover input files")?;
    info!(count = paths.len(), input = %input.display(), "found input files");
    progress.progress(10, &format!("found {} files", paths.len()));

    let mut frames = Vec::with_capacity(paths.len());
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for (idx, path) in paths.iter().enumerate() {
        cancel.check()?;
        let percent = 10 + (idx * 30 / paths.len()) as u8;
        progress.progress(percent, &format!("reading {}/{}", idx + 1, paths.len()));

        match read_csv_table(path, skip_top_rows) {
            Ok(frame) => {
                debug!(path = %path.display(), rows = frame.height(), "loaded file");
                files.push(LoadedFile {
                    path: path.clone(),
                    rows: frame.height(),
                });
                frames.push(frame);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping unreadable file");
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    if frames.is_empty() {
        return Err(IngestError::NoReadableFiles { count: paths.len() }.into());
    }

    progress.progress(42, "combining files");
    let frame = concat_frames(frames).context("combine input files")?;
    info!(rows = frame.height(), files = files.len(), "combined input files");
    Ok(LoadedInputs {
        frame,
        files,
        skipped,
    })
}

fn check_signature(profile: &Profile, raw: &DataFrame) {
    let signature = &profile.signature;
    if signature.required_columns.is_empty() {
        return;
    }
    let columns: Vec<String> = raw
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    if !signature.matches(&columns) {
        warn!(
            match_ratio = signature.match_ratio(&columns),
            min_match_ratio = signature.min_match_ratio,
            "input headers do not match the profile signature"
        );
    }
}

// ============================================================================
// Stage 4: Map
// ============================================================================

/// Renames mapped source columns to standard fields.
///
/// Fails when a required field is unmapped or missing from the data.
pub fn map_columns(profile: &Profile, raw: &DataFrame) -> Result<DataFrame> {
    let mapper = ColumnMapper::from_profile(profile);
    mapper
        .require_columns(raw)
        .with_context(|| format!("profile {} does not fit the input", profile.id))?;
    let mapped = mapper.apply(raw).context("apply column mapping")?;
    info!(
        fields = ?mapped.get_column_names(),
        "mapped columns"
    );
    Ok(mapped)
}

// ============================================================================
// Stage 5: Standardize
// ============================================================================

/// Appends `test_code`/`unit_std` and drops unselected tests when the
/// profile asks for it.
pub fn standardize_tests(profile: &Profile, mut mapped: DataFrame) -> Result<StandardizedTests> {
    let table = TestAliasTable::from_profile(profile);
    table
        .standardize_column(&mut mapped, TEST_NAME)
        .context("standardize test names")?;

    let selected: BTreeSet<String> = table.codes().map(str::to_string).collect();
    let unselected = unselected_codes(&mapped, &selected)?;
    warn_unselected(&unselected, profile.output_options.drop_unknown_tests);

    if !profile.output_options.drop_unknown_tests {
        return Ok(StandardizedTests {
            frame: mapped,
            unselected,
            dropped_rows: 0,
        });
    }

    let outcome = filter_selected(&mapped, &selected).context("filter selected tests")?;
    info!(
        selected = selected.len(),
        kept = outcome.frame.height(),
        dropped = outcome.dropped_rows,
        "filtered selected tests"
    );
    Ok(StandardizedTests {
        frame: outcome.frame,
        unselected,
        dropped_rows: outcome.dropped_rows,
    })
}

fn unselected_codes(df: &DataFrame, selected: &BTreeSet<String>) -> Result<BTreeSet<String>> {
    Ok(column_strings(df, TEST_CODE)?
        .into_iter()
        .flatten()
        .filter(|code| !selected.contains(code))
        .collect())
}

fn warn_unselected(unselected: &BTreeSet<String>, dropped: bool) {
    if unselected.is_empty() {
        return;
    }
    let listed: Vec<&str> = unselected
        .iter()
        .take(MAX_LISTED_TESTS)
        .map(String::as_str)
        .collect();
    warn!(
        count = unselected.len(),
        tests = ?listed,
        more = unselected.len().saturating_sub(MAX_LISTED_TESTS),
        dropped,
        "tests found in the data are not selected by the profile"
    );
}

// ============================================================================
// Stages 6-7: Parse, Datetimes
// ============================================================================

/// Keeps rows with a numeric value. Returns the frame and the rows dropped.
pub fn drop_failed_rows(df: &DataFrame) -> Result<(DataFrame, usize)> {
    let mask = df.column(VALUE_NUMERIC)?.is_not_null();
    let kept = df.filter(&mask)?;
    let dropped = df.height() - kept.height();
    info!(dropped, "dropped rows without a numeric value");
    Ok((kept, dropped))
}

/// Normalizes `sample_datetime` when present.
pub fn normalize_datetimes(df: &mut DataFrame) -> Result<Option<DatetimeSummary>> {
    if !has_column(df, SAMPLE_DATETIME) {
        warn!(column = SAMPLE_DATETIME, "column not found; datetimes left as is");
        return Ok(None);
    }

    let originals = column_strings(df, SAMPLE_DATETIME)?;
    let summary =
        normalize_datetime_column(df, SAMPLE_DATETIME).context("normalize sample datetimes")?;
    info!(
        original = summary.original,
        parsed = summary.parsed,
        "normalized sample datetimes"
    );

    if summary.failed() > 0 {
        let normalized = column_strings(df, SAMPLE_DATETIME)?;
        let samples: Vec<&str> = originals
            .iter()
            .zip(&normalized)
            .filter_map(|(original, parsed)| match (original, parsed) {
                (Some(original), None) => Some(redact_value(original)),
                _ => None,
            })
            .take(MAX_DATETIME_SAMPLES)
            .collect();
        debug!(samples = ?samples, "unparsed datetime samples");
    }
    Ok(Some(summary))
}

// ============================================================================
// Stages 8-9: Output, Export
// ============================================================================

/// Projects the long-format output table and stamps run metadata.
///
/// Columns follow the standard order, then `ijwi_*` passthrough columns
/// sorted by name, then `profile_id` and `run_id`. Absent columns are skipped.
pub fn build_labs_long(df: &DataFrame, profile_id: &str, run_id: &str) -> Result<DataFrame> {
    let mut passthrough: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.starts_with(PASSTHROUGH_PREFIX))
        .map(|name| name.to_string())
        .collect();
    passthrough.sort();

    let selection: Vec<String> = LABS_LONG_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain(passthrough)
        .filter(|name| has_column(df, name))
        .collect();

    let mut labs_long = df.select(selection)?;
    let height = labs_long.height();
    labs_long.with_column(Series::new(PROFILE_ID.into(), vec![profile_id; height]))?;
    labs_long.with_column(Series::new(RUN_ID.into(), vec![run_id; height]))?;
    info!(rows = height, columns = labs_long.width(), "built labs_long");
    Ok(labs_long)
}

/// Writes `labs_long_<run_id>.csv` and `qc_report_<run_id>.json`.
///
/// A failed report write is logged and does not fail the run.
pub fn export_outputs(
    labs_long: &DataFrame,
    report: &QualityReport,
    output_dir: &Path,
    run_id: &str,
) -> Result<OutputFiles> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;

    let labs_long_path = output_dir.join(format!("labs_long_{run_id}.csv"));
    let mut file = File::create(&labs_long_path)
        .with_context(|| format!("create {}", labs_long_path.display()))?;
    let mut frame = labs_long.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)
        .with_context(|| format!("write {}", labs_long_path.display()))?;
    info!(path = %labs_long_path.display(), rows = frame.height(), "wrote labs_long");

    let report_path = output_dir.join(format!("qc_report_{run_id}.json"));
    let qc_report = match report.write_json(&report_path) {
        Ok(()) => Some(report_path),
        Err(error) => {
            warn!(%error, "quality report export failed");
            None
        }
    };

    Ok(OutputFiles {
        labs_long: labs_long_path,
        qc_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis_model::TestDefinition;

    fn profile() -> Profile {
        let mut profile = Profile::new("unit");
        profile
            .test_mapping
            .insert("CEA", TestDefinition::new(["CEA", "癌胚抗原"]).with_unit("ng/mL"));
        profile
    }

    fn mapped_frame() -> DataFrame {
        df! {
            "test_name" => ["癌胚抗原", "AFP", "cea", "WBC"],
            "test_value" => ["1.5", "3", "<0.5", "4.2"],
        }
        .unwrap()
    }

    #[test]
    fn test_standardize_filters_and_reports_unselected() {
        let outcome = standardize_tests(&profile(), mapped_frame()).unwrap();

        assert_eq!(outcome.frame.height(), 2);
        assert_eq!(outcome.dropped_rows, 2);
        let unselected: Vec<&str> = outcome.unselected.iter().map(String::as_str).collect();
        assert_eq!(unselected, ["AFP", "WBC"]);
    }

    #[test]
    fn test_standardize_keeps_unknown_when_configured() {
        let mut profile = profile();
        profile.output_options.drop_unknown_tests = false;

        let outcome = standardize_tests(&profile, mapped_frame()).unwrap();

        assert_eq!(outcome.frame.height(), 4);
        assert_eq!(outcome.unselected.len(), 2);
        assert_eq!(outcome.dropped_rows, 0);
    }

    #[test]
    fn test_drop_failed_rows() {
        let df = df! { "value_numeric" => [Some(1.0), None, Some(2.0)] }.unwrap();
        let (kept, dropped) = drop_failed_rows(&df).unwrap();
        assert_eq!(kept.height(), 2);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_build_labs_long_orders_columns() {
        let df = df! {
            "ijwi_room" => ["A"],
            "test_value" => ["1"],
            "patient_id" => ["P1"],
            "ijwi_bed" => ["3"],
            "department" => ["ICU"],
        }
        .unwrap();

        let labs_long = build_labs_long(&df, "hospital_a", "20240301_093000").unwrap();

        let names: Vec<&str> = labs_long
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect();
        assert_eq!(
            names,
            ["patient_id", "test_value", "ijwi_bed", "ijwi_room", "profile_id", "run_id"]
        );
        let run_ids = labs_long.column("run_id").unwrap().str().unwrap();
        assert_eq!(run_ids.get(0), Some("20240301_093000"));
    }

    #[test]
    fn test_normalize_datetimes_without_column() {
        let mut df = df! { "test_value" => ["1"] }.unwrap();
        assert_eq!(normalize_datetimes(&mut df).unwrap(), None);
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let shared = token.clone();
        assert!(token.check().is_ok());
        shared.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(Cancelled));
    }
}
