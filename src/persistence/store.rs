//! Instance store - One directory per instance under the profile path
//!
//! ```text
//! <profile_path>/
//! +-- test-1/
//!     +-- instance.json        # metadata record, marks the directory as an instance
//!     +-- extensions/<file>    # copied extension files
//!     +-- chrome/userChrome.css
//!     +-- user.js
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{Configuration, Error, Instance, ProfileDefinition, Result, Usage};

/// Name of the metadata file inside every instance directory
pub const METADATA_FILE: &str = "instance.json";

const CHROME_DIR: &str = "chrome";
const EXTENSIONS_DIR: &str = "extensions";
const USER_CHROME_FILE: &str = "userChrome.css";
const USER_JS_FILE: &str = "user.js";

/// Metadata as stored on disk. The instance label is the directory name.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceRecord {
    profile_label: String,
    created: DateTime<Utc>,
    last_used: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage_pid: Option<u32>,
}

impl InstanceRecord {
    fn from_instance(instance: &Instance) -> Option<Self> {
        Some(Self {
            profile_label: instance.profile_label.clone(),
            created: instance.created?,
            last_used: instance.last_used?,
            usage_label: instance.usage_label().map(str::to_string),
            usage_pid: instance.usage_pid(),
        })
    }

    fn into_instance(self, instance_label: &str) -> std::result::Result<Instance, &'static str> {
        let usage = match (self.usage_pid, self.usage_label) {
            (Some(pid), label) => Some(Usage { pid, label }),
            (None, None) => None,
            (None, Some(_)) => return Err("usage label recorded without a usage PID"),
        };
        Ok(Instance {
            profile_label: self.profile_label,
            instance_label: instance_label.to_string(),
            created: Some(self.created),
            last_used: Some(self.last_used),
            usage,
        })
    }
}

/// Reads and writes instance directories. Holds no policy.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    root: PathBuf,
}

impl InstanceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the configuration's profile path
    pub fn for_config(config: &Configuration) -> Self {
        Self::new(&config.profile_path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn instance_dir(&self, instance_label: &str) -> PathBuf {
        self.root.join(instance_label)
    }

    /// Labels name a directory directly under the root and nothing else
    fn check_label(&self, instance_label: &str) -> Result<()> {
        let mut components = Path::new(instance_label).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == instance_label => Ok(()),
            _ => Err(Error::not_found(format!("instance '{}'", instance_label))),
        }
    }

    fn metadata_path(&self, instance_label: &str) -> PathBuf {
        self.instance_dir(instance_label).join(METADATA_FILE)
    }

    /// Labels of every directory carrying the metadata marker, sorted by name
    pub fn list_labels(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            Error::from_io(format!("profile path {}", self.root.display()), &self.root, e)
        })?;

        let mut labels = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(METADATA_FILE).is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(label) => labels.push(label),
                Err(name) => warn!("Ignoring instance directory with non UTF-8 name {:?}", name),
            }
        }
        labels.sort();
        Ok(labels)
    }

    /// Read one instance's metadata exactly as recorded
    pub fn load(&self, instance_label: &str) -> Result<Instance> {
        self.check_label(instance_label)?;
        let path = self.metadata_path(instance_label);
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::from_io(format!("instance '{}'", instance_label), &path, e))?;
        let record: InstanceRecord = serde_json::from_str(&text).map_err(|source| {
            Error::Metadata {
                path: path.clone(),
                source,
            }
        })?;
        record.into_instance(instance_label).map_err(|msg| Error::Metadata {
            path,
            source: <serde_json::Error as serde::de::Error>::custom(msg),
        })
    }

    /// Persist an instance's metadata, replacing the previous record atomically
    pub fn save(&self, instance: &Instance) -> Result<()> {
        self.check_label(&instance.instance_label)?;
        let record = InstanceRecord::from_instance(instance).ok_or_else(|| {
            Error::io(
                self.instance_dir(&instance.instance_label),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "instance has not been materialized",
                ),
            )
        })?;

        let path = self.metadata_path(&instance.instance_label);
        let json = serde_json::to_string_pretty(&record).map_err(|source| Error::Metadata {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::io(&path, e))?;
        debug!("Saved metadata for instance '{}'", instance.instance_label);
        Ok(())
    }

    /// Create the instance directory, copy the profile's files into it and
    /// stamp the creation time.
    ///
    /// Fails if the directory already exists. A partially written directory
    /// is removed again on failure.
    pub fn materialize(
        &self,
        config: &Configuration,
        profile: &ProfileDefinition,
        instance: &Instance,
    ) -> Result<Instance> {
        self.check_label(&instance.instance_label)?;
        let dir = self.instance_dir(&instance.instance_label);
        fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))?;
        fs::create_dir(&dir).map_err(|e| Error::io(&dir, e))?;

        let mut created = instance.clone();
        created.mark_created(Utc::now());

        let result = self
            .copy_profile_files(config, profile, &dir)
            .and_then(|()| self.save(&created));
        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!("Failed to clean up {:?}: {}", dir, cleanup);
            }
            return Err(e);
        }

        info!(
            "Materialized instance '{}' of profile '{}'",
            created.instance_label, profile.label
        );
        Ok(created)
    }

    fn copy_profile_files(
        &self,
        config: &Configuration,
        profile: &ProfileDefinition,
        dir: &Path,
    ) -> Result<()> {
        if !profile.extension_files.is_empty() {
            let extensions = dir.join(EXTENSIONS_DIR);
            fs::create_dir_all(&extensions).map_err(|e| Error::io(&extensions, e))?;
            for file in &profile.extension_files {
                let name = file.file_name().ok_or_else(|| {
                    Error::ConfigInvalid(format!(
                        "extension file {} of profile '{}' has no file name",
                        file.display(),
                        profile.label
                    ))
                })?;
                copy_file(&config.resolve_file(file), &extensions.join(name))?;
            }
        }

        if let Some(chrome) = &profile.user_chrome_file {
            let chrome_dir = dir.join(CHROME_DIR);
            fs::create_dir_all(&chrome_dir).map_err(|e| Error::io(&chrome_dir, e))?;
            copy_file(&config.resolve_file(chrome), &chrome_dir.join(USER_CHROME_FILE))?;
        }

        if let Some(user_js) = &profile.user_js_file {
            copy_file(&config.resolve_file(user_js), &dir.join(USER_JS_FILE))?;
        }

        Ok(())
    }

    /// Record the holding process and persist it
    pub fn mark_in_use(
        &self,
        instance: &mut Instance,
        pid: u32,
        label: Option<String>,
    ) -> Result<()> {
        instance.mark_in_use(pid, label);
        self.save(instance)?;
        info!(
            "Instance '{}' marked in use by PID {}",
            instance.instance_label, pid
        );
        Ok(())
    }

    /// Clear usage, bump `last_used` and persist
    pub fn mark_free(&self, instance: &mut Instance) -> Result<()> {
        instance.mark_free(Utc::now());
        self.save(instance)?;
        info!("Instance '{}' marked free", instance.instance_label);
        Ok(())
    }

    /// Remove an instance directory. Returns `false` if it did not exist.
    pub fn remove(&self, instance_label: &str) -> Result<bool> {
        self.check_label(instance_label)?;
        let dir = self.instance_dir(instance_label);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&dir, e)),
        }
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| Error::io(from, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instance(label: &str) -> Instance {
        let mut instance = Instance::new("test", label);
        instance.mark_created(Utc.with_ymd_and_hms(2021, 10, 24, 18, 12, 1).unwrap());
        instance
    }

    #[test]
    fn save_then_load_keeps_absent_fields_absent() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path());
        let saved = instance("test-1");
        fs::create_dir(store.instance_dir("test-1")).unwrap();

        store.save(&saved).unwrap();
        let text = fs::read_to_string(store.metadata_path("test-1")).unwrap();
        assert!(!text.contains("usagePid"));
        assert!(!text.contains("usageLabel"));
        assert_eq!(store.load("test-1").unwrap(), saved);
    }

    #[test]
    fn save_rejects_unmaterialized_instance() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path());
        let err = store.save(&Instance::new("test", "test-1")).unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::IoFailure);
    }

    #[test]
    fn topic_without_pid_is_malformed() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path());
        let dir = store.instance_dir("test-1");
        fs::create_dir(&dir).unwrap();
        fs::write(
            dir.join(METADATA_FILE),
            r#"{"profileLabel":"test","created":"2021-10-24T18:12:01Z","lastUsed":"2021-10-24T18:12:01Z","usageLabel":"orphan"}"#,
        )
        .unwrap();

        assert!(matches!(
            store.load("test-1"),
            Err(Error::Metadata { .. })
        ));
    }

    #[test]
    fn list_ignores_unmarked_directories_and_files() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path());
        for label in ["test-2", "test-1"] {
            fs::create_dir(store.instance_dir(label)).unwrap();
            store.save(&instance(label)).unwrap();
        }
        fs::create_dir(temp.path().join("scratch")).unwrap();
        fs::write(temp.path().join("stray.txt"), "x").unwrap();

        assert_eq!(store.list_labels().unwrap(), vec!["test-1", "test-2"]);
    }

    #[test]
    fn list_missing_root_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path().join("missing"));
        let err = store.list_labels().unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::NotFound);
    }

    #[test]
    fn labels_outside_the_root_are_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path().join("profiles"));
        fs::create_dir(temp.path().join("profiles")).unwrap();

        for label in ["", ".", "..", "../outside", "a/b", "/tmp"] {
            let err = store.load(label).unwrap_err();
            assert_eq!(err.kind(), crate::core::ErrorKind::NotFound, "{:?}", label);
            let err = store.remove(label).unwrap_err();
            assert_eq!(err.kind(), crate::core::ErrorKind::NotFound, "{:?}", label);
        }
        let err = store.save(&instance("../outside")).unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::NotFound);
    }

    #[test]
    fn remove_reports_whether_anything_was_deleted() {
        let temp = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(temp.path());
        fs::create_dir(store.instance_dir("test-1")).unwrap();
        store.save(&instance("test-1")).unwrap();

        assert!(store.remove("test-1").unwrap());
        assert!(!store.remove("test-1").unwrap());
        assert!(!store.instance_dir("test-1").exists());
    }

    #[test]
    fn failed_materialize_leaves_nothing_behind() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Configuration::new(temp.path().join("profiles"), Vec::new());
        config.config_dir = temp.path().to_path_buf();
        let store = InstanceStore::for_config(&config);
        let profile = ProfileDefinition::new("test").with_user_js_file("missing.js");

        let err = store
            .materialize(&config, &profile, &Instance::new("test", "test-1"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::IoFailure);
        assert!(!store.instance_dir("test-1").exists());
    }
}
