//! Flat `key=value` configuration loading with a small precedence chain
//! (component ambient to the transaction engine; see `loader::ConfigSource`).

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::{Error, Result};
pub use loader::{CliOverrides, ConfigLoader, ConfigSource};
pub use types::{ResolvedConfig, VirtualPkgAlias};
