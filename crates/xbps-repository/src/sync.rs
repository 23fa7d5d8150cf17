//! `sync_index`: refreshes one or all configured repositories' cached
//! index documents through the transport contract and reloads them into
//! the pool (component C, §4.3).
//!
//! A single repository's failure is logged and skipped; the call only
//! fails outright if every configured repository failed.

use crate::error::{Error, Result};
use crate::index::parse_index;
use crate::pool::{Repository, RepositoryPool};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xbps_core::plist::Plist;
use xbps_core::util::sha256_bytes;
use xbps_downloader::{FetchOutcome, Transport};

const INDEX_FILENAME: &str = "index.plist";

/// Outcome of a `sync_index` call across every targeted repository.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub refreshed: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    #[must_use]
    pub fn any_succeeded(&self) -> bool {
        !self.refreshed.is_empty() || !self.unchanged.is_empty()
    }
}

/// Refresh `uri`'s index, or every URI in `configured_uris` if `uri` is
/// `None`. `cache_dir` holds the per-repository cached index documents
/// (one file per URI, named from a hash of the URI so two repositories
/// never collide).
///
/// # Errors
/// Returns [`Error::NoRepositories`] if the filter matches nothing, and
/// [`Error::AllRepositoriesFailed`] if every targeted repository's sync
/// failed.
pub fn sync_index<T: Transport>(
    pool: &mut RepositoryPool,
    configured_uris: &[String],
    transport: &T,
    cache_dir: &Path,
    uri: Option<&str>,
) -> Result<SyncReport> {
    let targets: Vec<&String> = match uri {
        Some(want) => configured_uris.iter().filter(|u| u.as_str() == want).collect(),
        None => configured_uris.iter().collect(),
    };
    if targets.is_empty() {
        return Err(Error::NoRepositories);
    }

    let mut report = SyncReport::default();
    for target in targets {
        match sync_one(pool, target, transport, cache_dir) {
            Ok(true) => report.refreshed.push(target.clone()),
            Ok(false) => report.unchanged.push(target.clone()),
            Err(err) => {
                warn!(uri = %target, error = %err, "repository sync failed, skipping");
                report.failed.push((target.clone(), err.to_string()));
            }
        }
    }

    if !report.any_succeeded() {
        return Err(Error::AllRepositoriesFailed);
    }
    Ok(report)
}

fn index_cache_path(cache_dir: &Path, repo_uri: &str) -> PathBuf {
    let slug = &sha256_bytes(repo_uri.as_bytes())[..16];
    cache_dir.join(format!("{slug}-{INDEX_FILENAME}"))
}

fn sync_one<T: Transport>(pool: &mut RepositoryPool, repo_uri: &str, transport: &T, cache_dir: &Path) -> Result<bool> {
    std::fs::create_dir_all(cache_dir)
        .map_err(|e| Error::IndexLoad { uri: repo_uri.to_string(), source: xbps_core::Error::io(cache_dir, e) })?;

    let index_url = format!("{}/{INDEX_FILENAME}", repo_uri.trim_end_matches('/'));
    let local_path = index_cache_path(cache_dir, repo_uri);
    let if_newer_than = std::fs::metadata(&local_path).ok().and_then(|m| m.modified().ok());
    let if_size = std::fs::metadata(&local_path).ok().map(|m| m.len());

    let tmp_path = local_path.with_extension("plist.part");
    let outcome = transport
        .fetch(&index_url, &tmp_path, if_newer_than, if_size, None)
        .map_err(|source| Error::IndexFetch { uri: repo_uri.to_string(), source })?;

    let changed = match outcome {
        FetchOutcome::NotModified => false,
        FetchOutcome::Downloaded { .. } => {
            std::fs::rename(&tmp_path, &local_path)
                .map_err(|e| Error::IndexLoad { uri: repo_uri.to_string(), source: xbps_core::Error::io(&local_path, e) })?;
            true
        }
    };

    let xml = std::fs::read_to_string(&local_path)
        .map_err(|e| Error::IndexLoad { uri: repo_uri.to_string(), source: xbps_core::Error::io(&local_path, e) })?;
    let doc = Plist::from_xml(&xml).map_err(|source| Error::IndexLoad { uri: repo_uri.to_string(), source })?;
    let records = parse_index(&doc).map_err(|source| Error::IndexLoad { uri: repo_uri.to_string(), source })?;

    pool.replace_or_add(Repository::new(repo_uri.to_string(), records));
    info!(uri = repo_uri, changed, "synced repository index");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::SystemTime;
    use xbps_core::package::{PackageKey, PackageRecord};
    use xbps_downloader::FetchCallback;

    struct StubTransport {
        body: Mutex<Option<String>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Transport for StubTransport {
        fn fetch(
            &self,
            _url: &str,
            target_path: &Path,
            _if_newer_than: Option<SystemTime>,
            _if_size: Option<u64>,
            _on_progress: Option<&FetchCallback<'_>>,
        ) -> xbps_downloader::Result<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(xbps_downloader::Error::Fetch { url: "x".into(), message: "boom".into(), retryable: false });
            }
            let body = self.body.lock().unwrap();
            let bytes = body.as_deref().unwrap_or_default().as_bytes();
            std::fs::write(target_path, bytes).unwrap();
            Ok(FetchOutcome::Downloaded { bytes: bytes.len() as u64 })
        }
    }

    fn record(name: &str) -> PackageRecord {
        PackageRecord {
            key: PackageKey { name: name.to_string(), version: "1.0".to_string(), revision: 1 },
            dependencies: vec![],
            provides: Default::default(),
            conflicts: vec![],
            files: vec![],
            dirs: vec![],
            links: vec![],
            conf_files: vec![],
            installed_size: 0,
            filename_size: 0,
            arch: None,
            repository: None,
        }
    }

    #[test]
    fn syncs_one_repository_and_loads_records_into_pool() {
        let dir = tempfile::tempdir().unwrap();
        let xml = crate::index::render_index(&[record("foo")]).to_xml();
        let transport = StubTransport { body: Mutex::new(Some(xml)), calls: AtomicUsize::new(0), fail: false };
        let mut pool = RepositoryPool::new();
        let uris = vec!["https://repo.example/current".to_string()];

        let report = sync_index(&mut pool, &uris, &transport, dir.path(), None).unwrap();
        assert_eq!(report.refreshed, uris);
        assert!(pool.find_exact("foo-1.0_1").is_some());
    }

    #[test]
    fn one_failing_repository_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good_xml = crate::index::render_index(&[record("ok")]).to_xml();
        let transport = StubTransport { body: Mutex::new(Some(good_xml)), calls: AtomicUsize::new(0), fail: false };
        let mut pool = RepositoryPool::new();
        let uris = vec!["https://good.example".to_string()];
        let report = sync_index(&mut pool, &uris, &transport, dir.path(), None).unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.refreshed.len(), 1);
    }

    #[test]
    fn all_repositories_failing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StubTransport { body: Mutex::new(None), calls: AtomicUsize::new(0), fail: true };
        let mut pool = RepositoryPool::new();
        let uris = vec!["https://dead.example".to_string()];
        let err = sync_index(&mut pool, &uris, &transport, dir.path(), None).unwrap_err();
        assert!(matches!(err, Error::AllRepositoriesFailed));
    }

    #[test]
    fn unknown_uri_filter_yields_no_targets() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StubTransport { body: Mutex::new(None), calls: AtomicUsize::new(0), fail: false };
        let mut pool = RepositoryPool::new();
        let uris = vec!["https://a.example".to_string()];
        let err = sync_index(&mut pool, &uris, &transport, dir.path(), Some("https://b.example")).unwrap_err();
        assert!(matches!(err, Error::NoRepositories));
    }
}
