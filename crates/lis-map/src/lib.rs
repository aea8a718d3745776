//! Test-name standardization, column mapping and profile storage.
//!
//! - **alias**: [`TestAliasTable`], the alias → canonical test code index
//! - **column**: [`ColumnMapper`], source column → standard field renaming
//! - **repository**: [`ProfileRepository`], YAML profile storage

#![deny(unsafe_code)]

pub mod alias;
pub mod column;
mod error;
pub mod repository;

pub use alias::{
    AliasCollision, FilterOutcome, TestAliasTable, TestAliasTableBuilder, TestFrequency,
    filter_selected,
};
pub use column::{ColumnMapper, EXAMPLE_VALUE_MAX_CHARS, example_values, suggest_mapping};
pub use error::{MappingError, Result};
pub use repository::{ProfileMetadata, ProfileRepository, read_profile, sanitize_id};
