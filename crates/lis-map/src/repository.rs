//! Profile repository for persisting and reusing LIS profiles.
//!
//! # Storage Format
//!
//! Each profile is one YAML file named `{id}.yaml` in the repository
//! directory. Ids are sanitized to `[A-Za-z0-9_-]` before they become file
//! names, so a profile saved as `"Hospital A / v2"` is stored as
//! `HospitalAv2.yaml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use lis_model::Profile;
use tracing::{debug, warn};

use crate::error::{MappingError, Result};

const PROFILE_EXTENSION: &str = "yaml";

/// Format of the `created_at` stamp written on first save.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Summary of a stored profile.
#[derive(Debug, Clone)]
pub struct ProfileMetadata {
    pub id: String,
    /// File stem the profile is stored under.
    pub name: String,
    pub description: String,
    pub file_path: PathBuf,
    pub modified: SystemTime,
    pub test_count: usize,
}

/// Directory-backed store of [`Profile`]s.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    base_dir: PathBuf,
}

impl ProfileRepository {
    /// Opens a repository at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| MappingError::Io {
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Lists stored profiles, most recently modified first.
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ProfileMetadata>> {
        let entries = fs::read_dir(&self.base_dir).map_err(|source| MappingError::Io {
            path: self.base_dir.clone(),
            source,
        })?;

        let mut profiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| MappingError::Io {
                path: self.base_dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(PROFILE_EXTENSION));
            if !path.is_file() || !is_yaml {
                continue;
            }

            match read_metadata(&path) {
                Ok(metadata) => profiles.push(metadata),
                Err(error) => warn!(path = %path.display(), %error, "skipping unreadable profile"),
            }
        }

        profiles.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(profiles)
    }

    /// Loads a profile by id.
    pub fn load(&self, id: &str) -> Result<Profile> {
        let path = self.profile_path(id)?;
        if !path.is_file() {
            return Err(MappingError::ProfileNotFound { id: id.to_string() });
        }
        read_profile(&path)
    }

    /// Saves a profile, stamping `created_at` when it is not yet set.
    ///
    /// Returns the path written.
    pub fn save(&self, profile: &Profile) -> Result<PathBuf> {
        let path = self.profile_path(&profile.id)?;

        let mut stored = profile.clone();
        if stored.created_at.is_none() {
            stored.created_at = Some(Local::now().format(CREATED_AT_FORMAT).to_string());
        }
        let yaml = serde_yaml::to_string(&stored).map_err(|source| MappingError::ProfileSerialize {
            id: profile.id.clone(),
            source,
        })?;
        fs::write(&path, yaml).map_err(|source| MappingError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(id = %profile.id, path = %path.display(), "saved profile");
        Ok(path)
    }

    /// Deletes a stored profile. Returns `false` when it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let path = self.profile_path(id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| MappingError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(true)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.profile_path(id).is_ok_and(|path| path.is_file())
    }

    fn profile_path(&self, id: &str) -> Result<PathBuf> {
        let safe = sanitize_id(id);
        if safe.is_empty() {
            return Err(MappingError::InvalidProfileId { id: id.to_string() });
        }
        Ok(self.base_dir.join(format!("{safe}.{PROFILE_EXTENSION}")))
    }
}

/// Keeps ASCII alphanumerics, `_` and `-`.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}

/// Reads and parses a profile file.
pub fn read_profile(path: &Path) -> Result<Profile> {
    let contents = fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| MappingError::ProfileParse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_metadata(path: &Path) -> Result<ProfileMetadata> {
    let profile = read_profile(path)?;
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(ProfileMetadata {
        id: profile.id,
        name,
        description: profile.description,
        file_path: path.to_path_buf(),
        modified,
        test_count: profile.test_mapping.len(),
    })
}
