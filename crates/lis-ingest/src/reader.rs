//! CSV reading for LIS exports.
//!
//! Exports are read with every column as text so that identifiers keep their
//! leading zeros and result cells reach the value parser exactly as typed.

use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads an export into a DataFrame of string columns.
///
/// `skip_top_rows` banner lines above the header row are skipped. Header
/// names are trimmed and a leading byte-order mark is dropped.
pub fn read_csv_table(path: &Path, skip_top_rows: usize) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(IngestError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(skip_top_rows)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if df.height() == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }

    let trimmed: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    df.set_column_names(trimmed)?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded export"
    );
    Ok(df)
}

/// Stacks frames vertically, aligning columns by name.
///
/// The result has the union of all column names in first-seen order;
/// columns a frame lacks are filled with nulls. All frames must hold string
/// columns, as produced by [`read_csv_table`].
pub fn concat_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut columns: Vec<String> = Vec::new();
    for frame in &frames {
        for name in frame.get_column_names() {
            if !columns.iter().any(|c| c == name.as_str()) {
                columns.push(name.to_string());
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for frame in frames {
        let aligned = align_columns(frame, &columns)?;
        match combined.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
            None => combined = Some(aligned),
        }
    }

    let mut combined = combined.unwrap_or_default();
    combined.as_single_chunk_par();
    Ok(combined)
}

fn align_columns(frame: DataFrame, columns: &[String]) -> Result<DataFrame> {
    let height = frame.height();
    let mut aligned = Vec::with_capacity(columns.len());
    for name in columns {
        let column = match frame.column(name) {
            Ok(column) => column.cast(&DataType::String)?,
            Err(_) => Column::full_null(name.as_str().into(), height, &DataType::String),
        };
        aligned.push(column);
    }
    Ok(DataFrame::new(aligned)?)
}
