//! Instance model - One materialized working copy of a profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstanceStatus {
    /// No live process holds the instance
    Free,
    /// A live process holds the instance
    InUse,
}

impl InstanceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::InUse => "in use",
        }
    }
}

/// The process currently holding an instance and the topic it serves.
///
/// Both values are set and cleared together, so a topic can never outlive
/// the process it was recorded for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Operating system process identifier
    pub pid: u32,
    /// Caller-supplied topic, if one was given at acquisition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A materialized (or about to be materialized) copy of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Label of the owning profile
    pub profile_label: String,
    /// Label unique within the profile, also the directory name on disk
    pub instance_label: String,
    /// When the instance was first written to disk
    pub created: Option<DateTime<Utc>>,
    /// When the instance was last released
    pub last_used: Option<DateTime<Utc>>,
    /// Present while a process holds the instance
    pub usage: Option<Usage>,
}

impl Instance {
    /// A fresh instance that has not been written to disk yet
    pub fn new(profile_label: impl Into<String>, instance_label: impl Into<String>) -> Self {
        Self {
            profile_label: profile_label.into(),
            instance_label: instance_label.into(),
            created: None,
            last_used: None,
            usage: None,
        }
    }

    /// Whether the instance has been stamped by the store
    pub fn is_materialized(&self) -> bool {
        self.created.is_some()
    }

    pub fn is_in_use(&self) -> bool {
        self.usage.is_some()
    }

    pub fn status(&self) -> InstanceStatus {
        if self.is_in_use() {
            InstanceStatus::InUse
        } else {
            InstanceStatus::Free
        }
    }

    pub fn usage_pid(&self) -> Option<u32> {
        self.usage.as_ref().map(|u| u.pid)
    }

    pub fn usage_label(&self) -> Option<&str> {
        self.usage.as_ref().and_then(|u| u.label.as_deref())
    }

    /// Record the process holding this instance
    pub fn mark_in_use(&mut self, pid: u32, label: Option<String>) {
        self.usage = Some(Usage { pid, label });
    }

    /// Clear usage and bump `last_used`, never moving it backwards
    pub fn mark_free(&mut self, now: DateTime<Utc>) {
        self.usage = None;
        let floor = self.last_used.max(self.created);
        self.last_used = Some(floor.map_or(now, |floor| floor.max(now)));
    }

    /// Stamp creation time on a newly materialized instance
    pub fn mark_created(&mut self, now: DateTime<Utc>) {
        self.created = Some(now);
        self.last_used = Some(now);
    }
}
