//! Persistence layer - On-disk instance directories and their metadata

mod store;

pub use store::{InstanceStore, METADATA_FILE};
