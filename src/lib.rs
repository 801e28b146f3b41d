//! MultiProfile - Manage isolated on-disk instances of reusable profiles
//!
//! Instances are working copies of a profile template, each in its own
//! directory under the configured profile path. An instance is in use while
//! the process recorded in its metadata is alive.

pub mod core;
pub mod persistence;
mod platform;

pub use crate::core::{
    read_configuration, BaseDirs, Configuration, Error, ErrorKind, Instance, InstanceManager,
    InstanceStatus, LivenessChecker, ProcessTable, ProfileDefinition, Result, ScanFailure,
    ScanReport, SystemLiveness, Usage,
};
pub use crate::persistence::InstanceStore;

/// Application name constant
pub const APP_NAME: &str = "MultiProfile";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
