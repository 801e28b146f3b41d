//! Error types - Failures surfaced by instance lifecycle operations

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Profile path, profile, instance or configuration file is missing
    NotFound,
    /// Deletion blocked because the owning process is alive
    InstanceInUse,
    /// Filesystem or metadata failure
    IoFailure,
    /// Malformed or inconsistent configuration
    ConfigInvalid,
}

impl ErrorKind {
    /// Process exit code used by the command line front end
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigInvalid => 2,
            Self::NotFound => 3,
            Self::InstanceInUse => 5,
            Self::IoFailure => 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("instance '{instance}' of profile '{profile}' is in use")]
    InstanceInUse { profile: String, instance: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed instance metadata at {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InstanceInUse { .. } => ErrorKind::InstanceInUse,
            Self::Io { .. } | Self::Metadata { .. } => ErrorKind::IoFailure,
            Self::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Map `ENOENT` to `NotFound`, everything else to `Io`
    pub(crate) fn from_io(
        what: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(what)
        } else {
            Self::io(path, source)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let in_use = Error::InstanceInUse {
            profile: "test".into(),
            instance: "test-2".into(),
        };
        assert_eq!(in_use.kind(), ErrorKind::InstanceInUse);
        assert!(in_use.to_string().contains("test-2"));
        assert!(in_use.to_string().contains("'test'"));

        let missing = Error::from_io(
            "instance 'x'",
            "/nowhere",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let denied = Error::from_io(
            "instance 'x'",
            "/nowhere",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(denied.kind(), ErrorKind::IoFailure);

        assert_eq!(
            Error::ConfigInvalid("empty label".into()).kind(),
            ErrorKind::ConfigInvalid
        );
    }

    #[test]
    fn exit_codes_are_stable() {
        let cases = [
            (ErrorKind::ConfigInvalid, 2),
            (ErrorKind::NotFound, 3),
            (ErrorKind::InstanceInUse, 5),
            (ErrorKind::IoFailure, 8),
        ];
        for (kind, code) in cases {
            assert_eq!(kind.exit_code(), code);
        }
    }
}
