//! Instance manager - Scanning, selection, usage tracking and deletion for one configuration

use tracing::{info, warn};

use super::config::Configuration;
use super::deleter;
use super::error::{Error, ErrorKind, Result};
use super::instance::Instance;
use super::liveness::{LivenessChecker, SystemLiveness};
use super::scanner::{self, ScanReport};
use super::selector;
use super::topics;
use crate::persistence::InstanceStore;

/// Ties a configuration to its instance store and a liveness oracle
pub struct InstanceManager<L = SystemLiveness> {
    config: Configuration,
    store: InstanceStore,
    liveness: L,
}

impl InstanceManager<SystemLiveness> {
    pub fn new(config: Configuration) -> Self {
        Self::with_liveness(config, SystemLiveness)
    }
}

impl<L: LivenessChecker> InstanceManager<L> {
    pub fn with_liveness(config: Configuration, liveness: L) -> Self {
        let store = InstanceStore::for_config(&config);
        Self {
            config,
            store,
            liveness,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    /// Full scan including unreadable instance directories
    pub fn scan_report(&self) -> Result<ScanReport> {
        scanner::scan_report(&self.store, &self.liveness)
    }

    /// Every readable instance, usage resolved
    pub fn instances(&self) -> Result<Vec<Instance>> {
        scanner::scan(&self.store, &self.liveness)
    }

    /// Instances of one profile, oldest first
    pub fn profile_instances(&self, profile_label: &str) -> Result<Vec<Instance>> {
        scanner::scan_profile(&self.store, &self.liveness, profile_label)
    }

    /// One instance by label, usage resolved
    pub fn instance(&self, instance_label: &str) -> Result<Instance> {
        scanner::scan_one(&self.store, &self.liveness, instance_label)
    }

    /// Instances on disk, or none if the profile path has not been created yet
    fn existing_instances(&self) -> Result<Vec<Instance>> {
        match self.instances() {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            other => other,
        }
    }

    /// Hand an instance of `profile_label` to process `pid`.
    ///
    /// An instance of the profile already serving `topic` is returned as is.
    /// Otherwise the oldest free instance is reused, or a new one is
    /// materialized, and then marked in use.
    pub fn acquire(
        &self,
        profile_label: &str,
        pid: u32,
        topic: Option<&str>,
    ) -> Result<Instance> {
        let profile = self
            .config
            .find_profile_by_label(profile_label)
            .ok_or_else(|| Error::not_found(format!("profile '{}'", profile_label)))?;
        let instances = self.existing_instances()?;

        if let Some(topic) = topic {
            if let Some(serving) = instances
                .iter()
                .find(|i| i.profile_label == profile.label && i.usage_label() == Some(topic))
            {
                info!(
                    "Topic '{}' already served by instance '{}'",
                    topic, serving.instance_label
                );
                return Ok(serving.clone());
            }
        }

        let selected = selector::select_best(profile, &instances);
        let mut instance = if selected.is_materialized() {
            selected
        } else {
            self.store.materialize(&self.config, profile, &selected)?
        };
        self.store
            .mark_in_use(&mut instance, pid, topic.map(str::to_string))?;
        Ok(instance)
    }

    /// Mark an instance free again
    pub fn release(&self, instance_label: &str) -> Result<Instance> {
        let mut instance = self.store.load(instance_label)?;
        self.store.mark_free(&mut instance)?;
        Ok(instance)
    }

    /// Delete an instance unless a live process holds it
    pub fn delete(&self, instance_label: &str) -> Result<()> {
        let instance = match self.instance(instance_label) {
            Ok(instance) => instance,
            Err(Error::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        deleter::delete(&self.store, &self.liveness, &instance)
    }

    /// Delete every free instance of a profile, returning the deleted labels.
    ///
    /// Instances that became busy since the scan are left alone.
    pub fn prune(&self, profile_label: &str) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for instance in self.profile_instances(profile_label)? {
            if instance.is_in_use() {
                continue;
            }
            match deleter::delete(&self.store, &self.liveness, &instance) {
                Ok(()) => deleted.push(instance.instance_label),
                Err(e) if e.kind() == ErrorKind::InstanceInUse => {
                    warn!("Not pruning '{}': {}", instance.instance_label, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }

    /// Topics currently in use
    pub fn topics(&self) -> Result<Vec<String>> {
        Ok(topics::list_topics(&self.existing_instances()?))
    }

    /// The instance currently serving `topic`, if any
    pub fn find_by_topic(&self, topic: &str) -> Result<Option<Instance>> {
        let instances = self.existing_instances()?;
        Ok(topics::find_by_topic(&instances, topic).cloned())
    }
}
