//! Core module - Profile instances, liveness, selection and deletion

pub mod config;
pub mod deleter;
mod error;
mod instance;
pub mod liveness;
mod manager;
pub mod profile;
pub mod scanner;
pub mod selector;
pub mod topics;

pub use config::{read_configuration, BaseDirs, Configuration};
pub use error::{Error, ErrorKind, Result};
pub use instance::{Instance, InstanceStatus, Usage};
pub use liveness::{LivenessChecker, ProcessTable, SystemLiveness};
pub use manager::InstanceManager;
pub use profile::ProfileDefinition;
pub use scanner::{ScanFailure, ScanReport};
