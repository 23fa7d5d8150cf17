//! Synchronous fetch transport (component G): one conditional GET per
//! call, bounded retry for transient failures, streamed progress.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod transport;

pub use error::{Error, Result};
pub use transport::{FetchCallback, FetchOutcome, FetchPhase, FetchProgress, HttpTransport, RetryConfig, Transport};
