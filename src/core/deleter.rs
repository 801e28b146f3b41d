//! Instance deletion - Remove an instance only after re-checking it is free

use tracing::{debug, info};

use super::error::{Error, Result};
use super::instance::Instance;
use super::liveness::LivenessChecker;
use super::scanner;
use crate::persistence::InstanceStore;

/// Delete an instance's directory.
///
/// The instance is re-read from disk first; the caller's copy may predate a
/// process acquiring it. Fails with [`Error::InstanceInUse`] without touching
/// anything if a live process holds it. An instance that is already gone
/// counts as deleted.
pub fn delete<L>(store: &InstanceStore, liveness: &L, instance: &Instance) -> Result<()>
where
    L: LivenessChecker + ?Sized,
{
    let label = &instance.instance_label;
    let current = match scanner::scan_one(store, liveness, label) {
        Ok(current) => current,
        Err(Error::NotFound { .. }) => {
            debug!("Instance '{}' already gone", label);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if current.is_in_use() {
        return Err(Error::InstanceInUse {
            profile: current.profile_label,
            instance: current.instance_label,
        });
    }

    if store.remove(label)? {
        info!(
            "Deleted instance '{}' of profile '{}'",
            label, current.profile_label
        );
    }
    Ok(())
}
