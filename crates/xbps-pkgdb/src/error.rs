//! Local package database error type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use xbps_core::package::PackageState;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to acquire pkgdb lock on {path} within {timeout:?}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("pkgdb integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("no content staged for atomic write")]
    NoContent,

    #[error("invalid state transition for '{pkgname}': {from:?} -> {to:?}")]
    BadStateTransition {
        pkgname: String,
        from: PackageState,
        to: PackageState,
    },

    #[error("package '{0}' not registered in pkgdb")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] xbps_core::Error),
}

impl Error {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
