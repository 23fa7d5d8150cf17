//! An in-memory [`Transport`] for resolver/executor/repository tests
//! that need a fetchable URL without a live HTTP server.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use xbps_downloader::{Error, FetchCallback, FetchOutcome, FetchPhase, FetchProgress, Result, Transport};

/// A fixed table of `url -> bytes`, served as a single-shot download
/// with no retry and no real conditional-fetch comparison (every call
/// is treated as a fresh download unless `if_size` already matches).
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url` to serve `bytes` on the next `fetch`.
    pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.lock().unwrap().insert(url.into(), bytes.into());
    }
}

impl Transport for InMemoryTransport {
    fn fetch(
        &self,
        url: &str,
        target_path: &Path,
        _if_newer_than: Option<SystemTime>,
        if_size: Option<u64>,
        on_progress: Option<&FetchCallback<'_>>,
    ) -> Result<FetchOutcome> {
        let entries = self.entries.lock().unwrap();
        let bytes = entries.get(url).ok_or_else(|| Error::InvalidUrl(url.to_string()))?;

        if if_size == Some(bytes.len() as u64) {
            return Ok(FetchOutcome::NotModified);
        }

        let name = target_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if let Some(cb) = on_progress {
            cb(FetchProgress { total: Some(bytes.len() as u64), offset: 0, received: 0, name: &name, phase: FetchPhase::Start });
        }
        std::fs::write(target_path, bytes).map_err(|e| Error::Core(xbps_core::Error::io(target_path, e)))?;
        if let Some(cb) = on_progress {
            cb(FetchProgress {
                total: Some(bytes.len() as u64),
                offset: 0,
                received: bytes.len() as u64,
                name: &name,
                phase: FetchPhase::End,
            });
        }
        Ok(FetchOutcome::Downloaded { bytes: bytes.len() as u64 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_registered_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let transport = InMemoryTransport::new();
        transport.insert("https://repo.example/index.plist", b"hello".to_vec());

        let target = dir.path().join("index.plist");
        let outcome = transport.fetch("https://repo.example/index.plist", &target, None, None, None).unwrap();
        assert_eq!(outcome, FetchOutcome::Downloaded { bytes: 5 });
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    }

    #[test]
    fn matching_if_size_reports_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let transport = InMemoryTransport::new();
        transport.insert("https://repo.example/index.plist", b"hello".to_vec());

        let target = dir.path().join("index.plist");
        let outcome = transport.fetch("https://repo.example/index.plist", &target, None, Some(5), None).unwrap();
        assert_eq!(outcome, FetchOutcome::NotModified);
    }

    #[test]
    fn unknown_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = InMemoryTransport::new();
        let target = dir.path().join("index.plist");
        assert!(transport.fetch("https://missing.example", &target, None, None, None).is_err());
    }
}
