//! Profile definitions - Templates new instances are materialized from

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A named template describing the content of a new instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDefinition {
    /// Unique, non-empty key
    pub label: String,
    /// Extension files copied into every new instance
    #[serde(default)]
    pub extension_files: Vec<PathBuf>,
    /// Chrome-style override file
    #[serde(default)]
    pub user_chrome_file: Option<PathBuf>,
    /// Preferences script
    #[serde(default, rename = "userJSFile")]
    pub user_js_file: Option<PathBuf>,
}

impl ProfileDefinition {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            extension_files: Vec::new(),
            user_chrome_file: None,
            user_js_file: None,
        }
    }

    pub fn with_extension_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension_files.push(path.into());
        self
    }

    pub fn with_user_chrome_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_chrome_file = Some(path.into());
        self
    }

    pub fn with_user_js_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_js_file = Some(path.into());
        self
    }

    /// Every file this profile copies into a new instance
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.extension_files
            .iter()
            .chain(self.user_chrome_file.iter())
            .chain(self.user_js_file.iter())
    }
}
