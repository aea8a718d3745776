//! LIS export ingestion.
//!
//! Finds export files (a single file or every CSV in a folder) and loads them
//! into Polars DataFrames with all columns as text.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use lis_ingest::{concat_frames, discover_inputs, read_csv_table};
//!
//! let files = discover_inputs(Path::new("exports/2024-03"))?;
//! let frames = files
//!     .iter()
//!     .map(|path| read_csv_table(path, 2))
//!     .collect::<lis_ingest::Result<Vec<_>>>()?;
//! let combined = concat_frames(frames)?;
//! # Ok::<(), lis_ingest::IngestError>(())
//! ```

mod discovery;
mod error;
mod reader;

// === Error Types ===
pub use error::{IngestError, Result};

// === File Discovery ===
pub use discovery::{discover_inputs, list_csv_files};

// === CSV Reading ===
pub use reader::{concat_frames, read_csv_table};
