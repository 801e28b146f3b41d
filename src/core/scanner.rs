//! Instance scanning - Enumerate instances on disk with usage resolved
//!
//! A directory whose metadata cannot be read is skipped: the scan carries on
//! with its siblings and reports the failure in [`ScanReport::failures`].

use tracing::{debug, warn};

use super::error::{Error, Result};
use super::instance::Instance;
use super::liveness::LivenessChecker;
use crate::persistence::InstanceStore;

/// An instance directory that could not be read
#[derive(Debug)]
pub struct ScanFailure {
    pub instance_label: String,
    pub error: Error,
}

/// Outcome of a full scan
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Readable instances, grouped by profile and oldest first within a profile
    pub instances: Vec<Instance>,
    /// Instance directories skipped because their metadata was unreadable
    pub failures: Vec<ScanFailure>,
}

/// Scan every instance, keeping track of unreadable directories
pub fn scan_report<L>(store: &InstanceStore, liveness: &L) -> Result<ScanReport>
where
    L: LivenessChecker + ?Sized,
{
    let mut report = ScanReport::default();
    let mut found = Vec::new();

    for label in store.list_labels()? {
        match store.load(&label) {
            Ok(mut instance) => {
                resolve_usage(&mut instance, liveness);
                found.push(instance);
            }
            Err(error) => {
                warn!("Skipping unreadable instance '{}': {}", label, error);
                report.failures.push(ScanFailure {
                    instance_label: label,
                    error,
                });
            }
        }
    }

    report.instances = order_by_profile(found);
    debug!(
        "Scanned {} instances under {:?} ({} skipped)",
        report.instances.len(),
        store.root(),
        report.failures.len()
    );
    Ok(report)
}

/// Scan every instance of every profile.
///
/// Stale usage (a PID whose process has exited) is cleared in the returned
/// values only; nothing is written back to disk.
pub fn scan<L>(store: &InstanceStore, liveness: &L) -> Result<Vec<Instance>>
where
    L: LivenessChecker + ?Sized,
{
    scan_report(store, liveness).map(|report| report.instances)
}

/// Scan the instances of a single profile, oldest first
pub fn scan_profile<L>(
    store: &InstanceStore,
    liveness: &L,
    profile_label: &str,
) -> Result<Vec<Instance>>
where
    L: LivenessChecker + ?Sized,
{
    let mut instances = scan(store, liveness)?;
    instances.retain(|i| i.profile_label == profile_label);
    Ok(instances)
}

/// Read one instance by label with usage resolved
pub fn scan_one<L>(store: &InstanceStore, liveness: &L, instance_label: &str) -> Result<Instance>
where
    L: LivenessChecker + ?Sized,
{
    let mut instance = store.load(instance_label)?;
    resolve_usage(&mut instance, liveness);
    Ok(instance)
}

fn resolve_usage<L>(instance: &mut Instance, liveness: &L)
where
    L: LivenessChecker + ?Sized,
{
    if let Some(pid) = instance.usage_pid() {
        if !liveness.is_alive(pid) {
            debug!(
                "PID {} holding instance '{}' has exited, treating it as free",
                pid, instance.instance_label
            );
            instance.usage = None;
        }
    }
}

/// Profiles in first-seen order, each profile's instances by `created` ascending
fn order_by_profile(instances: Vec<Instance>) -> Vec<Instance> {
    let mut groups: Vec<(String, Vec<Instance>)> = Vec::new();
    for instance in instances {
        match groups
            .iter()
            .position(|(label, _)| *label == instance.profile_label)
        {
            Some(idx) => groups[idx].1.push(instance),
            None => groups.push((instance.profile_label.clone(), vec![instance])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(_, mut group)| {
            group.sort_by_key(|i| i.created);
            group
        })
        .collect()
}
