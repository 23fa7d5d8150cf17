//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration value for '{key}' in {path}: {message}")]
    InvalidValue { key: String, path: PathBuf, message: String },

    #[error("'{key}' requires a value in {path}")]
    MissingValue { key: String, path: PathBuf },

    #[error(transparent)]
    Core(#[from] xbps_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
