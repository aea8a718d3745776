//! Input discovery: a single export file or a folder of exports.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Lists all CSV files in a directory (non-recursive), sorted by filename.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && is_csv(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Resolves an input path to the export files it names.
///
/// A file is returned as-is whatever its extension; a folder yields its CSV
/// files and must contain at least one.
pub fn discover_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(IngestError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    let files = list_csv_files(input)?;
    if files.is_empty() {
        return Err(IngestError::NoCsvFiles {
            path: input.to_path_buf(),
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_export.csv"), "A\n1\n").unwrap();
        std::fs::write(dir.path().join("a_export.CSV"), "A\n1\n").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "notes").unwrap();
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();
        dir
    }

    #[test]
    fn test_list_csv_files_sorted() {
        let dir = create_test_dir();
        let files = list_csv_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a_export.CSV", "b_export.csv"]);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = create_test_dir();
        let file = dir.path().join("readme.txt");
        assert_eq!(discover_inputs(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_discover_empty_folder() {
        let dir = TempDir::new().unwrap();
        let err = discover_inputs(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::NoCsvFiles { .. }));
    }

    #[test]
    fn test_discover_missing_path() {
        let err = discover_inputs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, IngestError::InputNotFound { .. }));
    }
}
