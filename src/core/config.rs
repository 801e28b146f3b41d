//! Configuration loading - Profile definitions and the instance root

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::error::{Error, Result};
use super::profile::ProfileDefinition;

/// Directory name used under the platform cache directory
pub const DEFAULT_PROFILE_DIR_NAME: &str = "multiprofile";

/// Resolved configuration consumed by the lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Absolute or config-relative directory holding one subdirectory per instance
    pub profile_path: PathBuf,
    /// Profile definitions in file order
    pub profiles: Vec<ProfileDefinition>,
    /// Directory of the configuration file; relative profile files resolve against it
    pub config_dir: PathBuf,
}

/// Configuration file as written by the user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfiguration {
    #[serde(default)]
    profile_path: Option<String>,
    #[serde(default)]
    profiles: Vec<ProfileDefinition>,
}

/// User directories used to expand default and home-relative profile paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseDirs {
    pub home: Option<PathBuf>,
    pub cache: Option<PathBuf>,
}

impl BaseDirs {
    /// Look the directories up for the current user
    pub fn from_env() -> Self {
        Self {
            home: dirs::home_dir(),
            cache: dirs::cache_dir(),
        }
    }
}

/// Read a configuration file, resolving paths against the current user's directories
pub fn read_configuration(path: impl AsRef<Path>) -> Result<Configuration> {
    read_configuration_with(path, &BaseDirs::from_env())
}

/// Read a configuration file with explicit user directories
pub fn read_configuration_with(
    path: impl AsRef<Path>,
    base: &BaseDirs,
) -> Result<Configuration> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::from_io(format!("configuration file {}", path.display()), path, e)
    })?;
    let raw: RawConfiguration = serde_json::from_str(&text)
        .map_err(|e| Error::ConfigInvalid(format!("{}: {}", path.display(), e)))?;

    let config_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let profile_path = resolve_profile_path(raw.profile_path.as_deref(), &config_dir, base)?;
    debug!("Profile path resolved to {:?}", profile_path);

    let config = Configuration {
        profile_path,
        profiles: raw.profiles,
        config_dir,
    };
    config.validate()?;
    Ok(config)
}

/// Turn the user-supplied profile path into the directory instances live in.
///
/// Empty or missing values fall back to the cache directory, `~` expands to
/// the home directory, absolute paths are kept and anything else is relative
/// to the configuration file's directory.
pub fn resolve_profile_path(
    raw: Option<&str>,
    config_dir: &Path,
    base: &BaseDirs,
) -> Result<PathBuf> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        let cache = base.cache.as_ref().ok_or_else(|| {
            Error::ConfigInvalid("no cache directory for the default profile path".into())
        })?;
        return Ok(cache.join(DEFAULT_PROFILE_DIR_NAME));
    }

    if raw == "~" || raw.starts_with("~/") {
        let home = base.home.as_ref().ok_or_else(|| {
            Error::ConfigInvalid(format!("cannot expand '{}' without a home directory", raw))
        })?;
        let rest = raw.trim_start_matches('~').trim_start_matches('/');
        return Ok(if rest.is_empty() { home.clone() } else { home.join(rest) });
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(config_dir.join(path))
    }
}

impl Configuration {
    pub fn new(profile_path: impl Into<PathBuf>, profiles: Vec<ProfileDefinition>) -> Self {
        Self {
            profile_path: profile_path.into(),
            profiles,
            config_dir: PathBuf::from("."),
        }
    }

    /// Labels must be non-empty, unique and usable as directory names
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            let label = profile.label.as_str();
            if label.trim().is_empty() {
                return Err(Error::ConfigInvalid("profile label must not be empty".into()));
            }
            if label == "." || label == ".." || label.contains(['/', '\\']) {
                return Err(Error::ConfigInvalid(format!(
                    "profile label '{}' is not a valid directory name",
                    label
                )));
            }
            if !seen.insert(label) {
                return Err(Error::ConfigInvalid(format!("duplicate profile label '{}'", label)));
            }
        }
        Ok(())
    }

    /// Verify every profile file exists on disk
    pub fn check_files(&self) -> Result<()> {
        for profile in &self.profiles {
            for file in profile.files() {
                let resolved = self.resolve_file(file);
                if !resolved.is_file() {
                    return Err(Error::ConfigInvalid(format!(
                        "profile '{}' references missing file {}",
                        profile.label,
                        resolved.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve a profile file path against the configuration directory
    pub fn resolve_file(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.config_dir.join(file)
        }
    }

    pub fn find_profile_by_label(&self, label: &str) -> Option<&ProfileDefinition> {
        self.profiles.iter().find(|p| p.label == label)
    }

    pub fn profile_labels(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.label.clone()).collect()
    }
}
