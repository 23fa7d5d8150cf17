//! Transaction executor errors.

use std::path::PathBuf;
use thiserror::Error;
use xbps_core::package::PackageState;

#[derive(Error, Debug)]
pub enum Error {
    #[error("download of '{pkgver}' failed: {source}")]
    DownloadFail { pkgver: String, #[source] source: xbps_downloader::Error },

    #[error("verification of '{pkgver}' failed: advertised sha256 {expected} but archive has {actual}")]
    VerifyFail { pkgver: String, expected: String, actual: String },

    #[error("unpacking '{pkgver}' failed at {path}: {message}")]
    UnpackFail { pkgver: String, path: PathBuf, message: String },

    #[error("configure script for '{pkgver}' failed: {message}")]
    ConfigureFail { pkgver: String, message: String },

    #[error("removal of '{pkgver}' failed: {message}")]
    RemoveFail { pkgver: String, message: String },

    #[error("transaction cancelled by callback during '{pkgver}'")]
    Cancelled { pkgver: String },

    #[error("plan contains a dependency cycle: {0:?}")]
    Cycle(Vec<String>),

    #[error("package '{name}' in state {from:?} cannot reach {to:?}")]
    BadTransition { name: String, from: PackageState, to: PackageState },

    #[error(transparent)]
    Archive(#[from] xbps_archive::Error),

    #[error(transparent)]
    Pkgdb(#[from] xbps_pkgdb::Error),

    #[error(transparent)]
    Core(#[from] xbps_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
