//! Resolution errors returned directly to the caller (as opposed to the
//! `missing`/`conflicts` lists accumulated on a `TransactionDocument`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no repositories configured")]
    NoRepositories,

    #[error("'{0}' not found in any configured repository")]
    NotFound(String),

    #[error("'{0}' is already installed")]
    AlreadyInstalled(String),

    #[error("'{0}' is already at the best available version")]
    UpToDate(String),

    #[error("'{0}' is not installed")]
    NotInstalled(String),

    #[error(transparent)]
    Repository(#[from] xbps_repository::Error),

    #[error(transparent)]
    Core(#[from] xbps_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
