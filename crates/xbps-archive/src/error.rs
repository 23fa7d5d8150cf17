//! Archive reader errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unrecognized archive compression for {0}")]
    UnknownCompression(PathBuf),

    #[error("archive {path} is missing required metadata entry '{entry}'")]
    MissingMetadata { path: PathBuf, entry: &'static str },

    #[error("malformed tar entry in {path}: {message}")]
    MalformedEntry { path: PathBuf, message: String },

    #[error(transparent)]
    Core(#[from] xbps_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
