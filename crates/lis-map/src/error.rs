//! Error types for mapping and profile storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from column mapping, test standardization and the profile repository.
#[derive(Debug, Error)]
pub enum MappingError {
    // === Profile/data mismatch ===
    /// Required standard fields whose source columns are absent from the data.
    #[error("missing required columns: {}", .fields.join(", "))]
    MissingColumns { fields: Vec<String> },

    /// A column the operation reads is not in the frame.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    // === Profile repository ===
    #[error("profile not found: {id}")]
    ProfileNotFound { id: String },

    #[error("invalid profile id '{id}'")]
    InvalidProfileId { id: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile {path}: {source}")]
    ProfileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize profile '{id}': {source}")]
    ProfileSerialize {
        id: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

pub type Result<T> = std::result::Result<T, MappingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_display() {
        let err = MappingError::MissingColumns {
            fields: vec!["test_name".to_string(), "test_value".to_string()],
        };
        assert_eq!(err.to_string(), "missing required columns: test_name, test_value");
    }
}
