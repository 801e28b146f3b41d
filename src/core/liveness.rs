//! Liveness checks - Whether a recorded PID still belongs to a running process
//!
//! PIDs can be recycled by the operating system, so a live answer for an old
//! PID may be a false positive. Callers accept that rather than cross-checking
//! process start times. Zombies (exited, not yet reaped) count as dead for
//! every checker here.

use std::collections::HashSet;

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};
use tracing::trace;

use crate::platform;

/// Answers whether a process identifier refers to a running process.
///
/// Implementations never fail: anything that cannot be confirmed alive is dead.
pub trait LivenessChecker {
    fn is_alive(&self, pid: u32) -> bool;
}

impl<F> LivenessChecker for F
where
    F: Fn(u32) -> bool,
{
    fn is_alive(&self, pid: u32) -> bool {
        self(pid)
    }
}

/// Probes each PID directly through the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLiveness;

impl LivenessChecker for SystemLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0 && platform::is_process_running(pid) && !is_zombie(pid)
    }
}

/// The platform probe still answers for exited processes nobody has reaped
fn is_zombie(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::new(),
    );
    system
        .process(pid)
        .is_some_and(|process| process.status() == ProcessStatus::Zombie)
}

/// Snapshot of the process table taken once, for checking many PIDs at a time
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    live: HashSet<u32>,
}

impl ProcessTable {
    /// Capture the currently running processes, zombies excluded
    pub fn snapshot() -> Self {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new(),
        );

        let live: HashSet<u32> = system
            .processes()
            .iter()
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .map(|(pid, _)| pid.as_u32())
            .collect();
        trace!("Process table snapshot holds {} processes", live.len());

        Self { live }
    }
}

impl LivenessChecker for ProcessTable {
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0 && self.live.contains(&pid)
    }
}
