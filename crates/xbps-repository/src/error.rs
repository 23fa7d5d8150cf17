//! Repository-pool error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("[E0206] no repositories configured")]
    NoRepositories,

    #[error("repository '{uri}' index load failed: {source}")]
    IndexLoad {
        uri: String,
        #[source]
        source: xbps_core::Error,
    },

    #[error("repository '{uri}' fetch failed: {source}")]
    IndexFetch {
        uri: String,
        #[source]
        source: xbps_downloader::Error,
    },

    #[error("all configured repositories failed to sync")]
    AllRepositoriesFailed,

    #[error(transparent)]
    Core(#[from] xbps_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
