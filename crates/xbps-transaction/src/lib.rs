//! Transaction executor (component G): drives a resolved plan through
//! download, verify, run, and configure phases against one repository
//! pool and one local package database.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod callbacks;
pub mod config_merge;
pub mod download_pool;
pub mod error;
pub mod executor;
pub mod ordering;

pub use callbacks::{Callbacks, Cancel, StateEvent, StateTag, UnpackProgress};
pub use config_merge::{ConfFileAction, ConfFileHashes};
pub use error::{Error, Result};
pub use executor::{ExecutionReport, ExecutorConfig, Handle};
pub use ordering::order_steps;
