//! Transport errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String, retryable: bool },

    #[error("fetch of {url} exhausted its retry budget after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error(transparent)]
    Core(#[from] xbps_core::Error),

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

impl Error {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Core(xbps_core::Error::io(path, err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
