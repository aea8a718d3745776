//! CLI argument definitions for `lis-extract`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use lis_transform::DEFAULT_MAX_SAMPLES;

#[derive(Parser)]
#[command(
    name = "lis-extract",
    version,
    about = "Extract standardized lab results from LIS exports",
    long_about = "Extract standardized lab results from hospital LIS exports.\n\n\
                  A profile maps the export's columns, test names and result encodings\n\
                  to a long-format table (labs_long) plus a data quality report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient-level values (ids, raw results) in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a profile over an export file or folder and write labs_long plus a QC report.
    Extract(ExtractArgs),

    /// Survey the value formats of one column.
    Inspect(InspectArgs),

    /// Count raw test names and show their standardized codes.
    Tests(TestsArgs),

    /// List stored profiles.
    Profiles(ProfilesArgs),
}

#[derive(Parser)]
pub struct ExtractArgs {
    /// CSV export or folder of CSV exports.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Profile YAML file.
    #[arg(long = "profile", value_name = "PATH")]
    pub profile: PathBuf,

    /// Output directory (default: <INPUT folder>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Run every stage and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// CSV export or folder of CSV exports.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Source column to survey.
    #[arg(long = "column", value_name = "NAME")]
    pub column: String,

    /// Banner rows above the header row.
    #[arg(long = "skip-rows", value_name = "N", default_value_t = 0)]
    pub skip_rows: usize,

    /// Distinct values to survey.
    #[arg(long = "max-samples", value_name = "N", default_value_t = DEFAULT_MAX_SAMPLES)]
    pub max_samples: usize,
}

#[derive(Parser)]
pub struct TestsArgs {
    /// CSV export or folder of CSV exports.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Profile YAML file.
    #[arg(long = "profile", value_name = "PATH")]
    pub profile: PathBuf,
}

#[derive(Parser)]
pub struct ProfilesArgs {
    /// Profile directory.
    #[arg(long = "dir", value_name = "DIR", default_value = "profiles")]
    pub dir: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
