//! The transport contract (component ambient to the transaction
//! executor): a single blocking `fetch` call per invocation, with bounded
//! retry for transient failures layered on top. Parallelism across
//! repositories is the executor's concern (a scoped worker pool calling
//! `fetch` repeatedly), not this module's.

use crate::error::{Error, Result};
use backon::{BackoffBuilder, ExponentialBuilder};
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// A phase boundary in one fetch's progress stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Start,
    Update,
    End,
}

/// One progress notification, invoked synchronously on the caller's
/// thread — long work here blocks the fetch itself.
#[derive(Debug, Clone, Copy)]
pub struct FetchProgress<'a> {
    pub total: Option<u64>,
    pub offset: u64,
    pub received: u64,
    pub name: &'a str,
    pub phase: FetchPhase,
}

pub type FetchCallback<'a> = dyn Fn(FetchProgress<'_>) + 'a;

/// What one `fetch` call accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: u64 },
    NotModified,
}

/// A single synchronous fetch, conditional on either a cached mtime or
/// a cached size. Implementations may retry transient failures
/// internally but must still behave as one suspension point to the
/// caller.
pub trait Transport: Send + Sync {
    /// # Errors
    /// Returns an error if the fetch fails after exhausting retries.
    fn fetch(
        &self,
        url: &str,
        target_path: &Path,
        if_newer_than: Option<SystemTime>,
        if_size: Option<u64>,
        on_progress: Option<&FetchCallback<'_>>,
    ) -> Result<FetchOutcome>;
}

/// Bounded exponential backoff for transient transport failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(500), max_delay: Duration::from_secs(30) }
    }
}

impl RetryConfig {
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .build()
    }
}

/// The default transport: a blocking `reqwest` client with bounded
/// retry and a streamed progress callback invoked at chunk boundaries.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    retry: RetryConfig,
}

impl HttpTransport {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch { url: String::new(), message: e.to_string(), retryable: false })?;
        Ok(Self { client, retry: RetryConfig::default() })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn fetch_once(
        &self,
        url: &str,
        target_path: &Path,
        if_newer_than: Option<SystemTime>,
        on_progress: Option<&FetchCallback<'_>>,
    ) -> Result<FetchOutcome> {
        let mut request = self.client.get(url);
        if let Some(mtime) = if_newer_than {
            let stamp = chrono::DateTime::<chrono::Utc>::from(mtime).to_rfc2822();
            request = request.header(reqwest::header::IF_MODIFIED_SINCE, stamp);
        }

        let mut response = request
            .send()
            .map_err(|e| Error::Fetch { url: url.to_string(), message: e.to_string(), retryable: is_retryable(&e) })?;

        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        if !response.status().is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
                retryable: response.status().is_server_error(),
            });
        }

        let total = response.content_length();
        let name = target_path.file_name().and_then(|n| n.to_str()).unwrap_or(url).to_string();
        if let Some(cb) = on_progress {
            cb(FetchProgress { total, offset: 0, received: 0, name: &name, phase: FetchPhase::Start });
        }

        let tmp_path = target_path.with_extension("part");
        let mut tmp_file = std::fs::File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        let mut received = 0u64;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = response
                .read(&mut buf)
                .map_err(|e| Error::Fetch { url: url.to_string(), message: e.to_string(), retryable: true })?;
            if n == 0 {
                break;
            }
            tmp_file.write_all(&buf[..n]).map_err(|e| Error::io(&tmp_path, e))?;
            received += n as u64;
            if let Some(cb) = on_progress {
                cb(FetchProgress { total, offset: received, received: n as u64, name: &name, phase: FetchPhase::Update });
            }
        }
        drop(tmp_file);
        std::fs::rename(&tmp_path, target_path).map_err(|e| Error::io(target_path, e))?;

        if let Some(cb) = on_progress {
            cb(FetchProgress { total, offset: received, received: 0, name: &name, phase: FetchPhase::End });
        }
        Ok(FetchOutcome::Downloaded { bytes: received })
    }
}

impl Transport for HttpTransport {
    fn fetch(
        &self,
        url: &str,
        target_path: &Path,
        if_newer_than: Option<SystemTime>,
        if_size: Option<u64>,
        on_progress: Option<&FetchCallback<'_>>,
    ) -> Result<FetchOutcome> {
        if let Some(size) = if_size {
            if std::fs::metadata(target_path).is_ok_and(|m| m.len() == size) {
                debug!(%url, size, "skipping fetch, cached size already matches");
                return Ok(FetchOutcome::NotModified);
            }
        }

        let mut backoff = self.retry.backoff();
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, target_path, if_newer_than, on_progress) {
                Ok(outcome) => return Ok(outcome),
                Err(e @ Error::Fetch { retryable: true, .. }) => {
                    let Some(delay) = backoff.next() else {
                        return Err(Error::RetriesExhausted { url: url.to_string(), attempts: attempt });
                    };
                    warn!(%url, attempt, ?delay, error = %e, "fetch failed, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.status().is_some_and(|s| s.is_server_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_budget_is_bounded() {
        let config = RetryConfig::default();
        let delays: Vec<_> = config.backoff().collect();
        assert_eq!(delays.len(), config.max_retries as usize);
    }

    #[test]
    fn http_transport_builds_with_custom_timeout() {
        assert!(HttpTransport::new(Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn fetch_outcome_equality() {
        assert_eq!(FetchOutcome::NotModified, FetchOutcome::NotModified);
        assert_ne!(FetchOutcome::Downloaded { bytes: 1 }, FetchOutcome::Downloaded { bytes: 2 });
    }
}
