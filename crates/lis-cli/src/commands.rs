use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lis_cli::pipeline::{
    CancellationToken, ExtractOptions, ExtractionResult, NoProgress, ProgressSink, load_inputs,
    run_extraction,
};
use lis_common::{column_strings, has_column};
use lis_map::{ColumnMapper, ProfileRepository, TestAliasTable, read_profile};
use lis_model::Profile;
use lis_model::fields::TEST_NAME;
use lis_transform::{detect_special_value_patterns, detect_value_formats};

use crate::cli::{ExtractArgs, InspectArgs, ProfilesArgs, TestsArgs};
use crate::summary::{print_format_summary, print_profiles, print_test_statistics};

/// Progress sink drawing an `indicatif` bar on stderr.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn progress(&self, percent: u8, message: &str) {
        self.bar.set_position(u64::from(percent));
        self.bar.set_message(message.to_string());
    }
}

fn load_profile(path: &Path) -> Result<Profile> {
    let profile =
        read_profile(path).with_context(|| format!("load profile {}", path.display()))?;
    info!(profile = %profile.id, tests = profile.test_mapping.len(), "loaded profile");
    Ok(profile)
}

/// Default output directory: `output/` next to the input file, or inside the input folder.
fn default_output_dir(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.join("output")
    } else {
        input
            .parent()
            .map_or_else(|| PathBuf::from("output"), |parent| parent.join("output"))
    }
}

pub fn run_extract(args: &ExtractArgs) -> Result<ExtractionResult> {
    let profile = load_profile(&args.profile)?;
    let options = ExtractOptions {
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&args.input)),
        dry_run: args.dry_run,
    };

    let progress = BarProgress::new();
    let result = run_extraction(
        &args.input,
        &profile,
        &options,
        &progress,
        &CancellationToken::new(),
    );
    progress.finish();
    result
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let loaded = load_inputs(
        &args.input,
        args.skip_rows,
        &NoProgress,
        &CancellationToken::new(),
    )?;
    if !has_column(&loaded.frame, &args.column) {
        let available: Vec<String> = loaded
            .frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        bail!(
            "column {} not found; available columns: {}",
            args.column,
            available.join(", ")
        );
    }

    let values = column_strings(&loaded.frame, &args.column)?;
    let summary = detect_value_formats(values.iter().map(Option::as_deref), args.max_samples);
    let patterns = detect_special_value_patterns(values.iter().map(Option::as_deref));
    print_format_summary(&args.column, &summary, &patterns);
    Ok(())
}

pub fn run_tests(args: &TestsArgs) -> Result<()> {
    let profile = load_profile(&args.profile)?;
    let mapper = ColumnMapper::from_profile(&profile);
    let Some(source) = mapper.source_for(TEST_NAME) else {
        bail!("profile {} does not map a {TEST_NAME} column", profile.id);
    };

    let loaded = load_inputs(
        &args.input,
        profile.signature.skip_top_rows,
        &NoProgress,
        &CancellationToken::new(),
    )?;
    let table = TestAliasTable::from_profile(&profile);
    let stats = table
        .test_statistics(&loaded.frame, source)
        .context("count test names")?;
    print_test_statistics(&stats, |code| table.contains_code(code));
    Ok(())
}

pub fn run_profiles(args: &ProfilesArgs) -> Result<()> {
    let repository = ProfileRepository::new(&args.dir)
        .with_context(|| format!("open profile directory {}", args.dir.display()))?;
    let profiles = repository.list().context("list profiles")?;
    print_profiles(&profiles);
    Ok(())
}
