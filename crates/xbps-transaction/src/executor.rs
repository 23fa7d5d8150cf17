//! Drives a sorted transaction plan through its four phases: download,
//! verify, run (unpack/remove), configure (component G in the system
//! overview).

use crate::callbacks::{Callbacks, Cancel, StateEvent, StateTag, UnpackProgress};
use crate::config_merge::{self, ConfFileAction, ConfFileHashes};
use crate::download_pool::{self, FetchEvent, FetchJob};
use crate::error::{Error, Result};
use crate::ordering::order_steps;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xbps_archive::{EntryHeader, PackageArchive};
use xbps_core::package::{InstalledPackage, PackageRecord, PackageState};
use xbps_core::util::{sha256_bytes, sha256_file};
use xbps_downloader::Transport;
use xbps_pkgdb::PackageDatabase;
use xbps_repository::RepositoryPool;
use xbps_resolver::{StepAction, TransactionDocument, TransactionStep};

const METADATA_DIR: &str = "var/db/xbps/metadata";

/// Knobs the executor needs beyond what's already in the resolved
/// configuration (rootdir, cache dir, worker count, force flags).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub rootdir: PathBuf,
    pub cache_dir: PathBuf,
    pub download_workers: usize,
    pub force_configure: bool,
    pub force_remove: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            rootdir: PathBuf::from("/"),
            cache_dir: PathBuf::from("/var/cache/xbps"),
            download_workers: num_cpus::get().clamp(1, 8),
            force_configure: false,
            force_remove: false,
        }
    }
}

/// What one `execute` call accomplished, by package name.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub installed: Vec<String>,
    pub updated: Vec<String>,
    pub configured: Vec<String>,
    pub removed: Vec<String>,
}

/// The process-local owner of one repository pool, one pkgdb, and one
/// callback trio (§9).
pub struct Handle<'cb, T: Transport> {
    pub pool: RepositoryPool,
    pub db: PackageDatabase,
    pub transport: T,
    pub config: ExecutorConfig,
    pub callbacks: Callbacks<'cb>,
}

impl<'cb, T: Transport + Sync> Handle<'cb, T> {
    #[must_use]
    pub fn new(pool: RepositoryPool, db: PackageDatabase, transport: T, config: ExecutorConfig) -> Self {
        Self { pool, db, transport, config, callbacks: Callbacks::default() }
    }

    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Callbacks<'cb>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Run every phase for a resolved, sorted-on-the-fly transaction.
    ///
    /// # Errors
    /// Returns an error (and aborts) on the first download, verify,
    /// unpack, configure, or cancellation failure.
    pub fn execute(&mut self, document: &TransactionDocument) -> Result<ExecutionReport> {
        let ordered = order_steps(&document.steps)?;

        let archive_hashes = self.download_phase(&ordered)?;
        self.verify_phase(&ordered, &archive_hashes)?;
        let mut report = self.run_phase(&ordered)?;
        self.configure_phase(&mut report)?;
        Ok(report)
    }

    fn emit_state(&self, tag: StateTag, description: &str, pkgname: Option<&str>, version: Option<&str>, err: Option<&str>) -> Cancel {
        self.callbacks.state(StateEvent { tag, description, pkgname, version, err })
    }

    fn locate_repo_uri(&self, pkgver: &str) -> Option<String> {
        self.pool.repositories().iter().find(|r| r.iter().any(|rec| rec.pkgver() == pkgver)).map(|r| r.uri.clone())
    }

    fn archive_path(&self, record: &PackageRecord) -> PathBuf {
        let arch = record.arch.clone().unwrap_or_else(|| "noarch".to_string());
        self.config.cache_dir.join(format!("{}.{}.xbps", record.pkgver(), arch))
    }

    /// Fetches every archive not already cached at the expected size,
    /// then returns each archive's freshly computed SHA-256 so the
    /// verify phase can re-check it after the fact.
    fn download_phase(&mut self, ordered: &[TransactionStep]) -> Result<BTreeMap<String, String>> {
        self.emit_state(StateTag::TransDownload, "starting download phase", None, None, None);

        let targets: Vec<(String, PathBuf, u64)> = ordered
            .iter()
            .filter(|s| matches!(s.action, StepAction::Install | StepAction::Update))
            .map(|s| (s.record.pkgver(), self.archive_path(&s.record), s.record.filename_size))
            .collect();

        let jobs: Vec<FetchJob> = targets
            .iter()
            .filter(|(_, path, size)| !(path.exists() && std::fs::metadata(path).map(|m| m.len()).unwrap_or(0) == *size))
            .filter_map(|(pkgver, path, size)| {
                let uri = self.locate_repo_uri(pkgver)?;
                let filename = path.file_name()?.to_string_lossy().to_string();
                Some(FetchJob {
                    pkgver: pkgver.clone(),
                    url: format!("{}/{}", uri.trim_end_matches('/'), filename),
                    target_path: path.clone(),
                    if_size: Some(*size),
                })
            })
            .collect();

        if !jobs.is_empty() {
            let callbacks = &self.callbacks;
            let results = download_pool::run_jobs(&self.transport, jobs, self.config.download_workers, |event| match event {
                FetchEvent::Progress(p) => {
                    let progress = xbps_downloader::FetchProgress {
                        total: p.total,
                        offset: p.offset,
                        received: p.received,
                        name: &p.pkgver,
                        phase: p.phase,
                    };
                    callbacks.fetch(progress).is_abort()
                }
                FetchEvent::Done(pkgver, result) => {
                    let ok = result.is_ok();
                    let err_msg = result.as_ref().err().map(std::string::ToString::to_string);
                    let event = StateEvent {
                        tag: StateTag::TransDownload,
                        description: if ok { "archive downloaded" } else { "archive download failed" },
                        pkgname: Some(pkgver),
                        version: None,
                        err: err_msg.as_deref(),
                    };
                    callbacks.state(event).is_abort()
                }
            });

            for (pkgver, result) in results {
                result.map_err(|source| Error::DownloadFail { pkgver, source })?;
            }
        }

        let mut hashes = BTreeMap::new();
        for (pkgver, path, _) in &targets {
            if path.exists() {
                hashes.insert(pkgver.clone(), sha256_file(path)?);
            }
        }
        Ok(hashes)
    }

    /// Recomputes each cached archive's hash and compares it to the
    /// value captured right after download, catching any corruption or
    /// tampering of the cache between the two phases.
    fn verify_phase(&mut self, ordered: &[TransactionStep], archive_hashes: &BTreeMap<String, String>) -> Result<()> {
        self.emit_state(StateTag::TransVerify, "verifying cached archives", None, None, None);

        for step in ordered {
            if !matches!(step.action, StepAction::Install | StepAction::Update) {
                continue;
            }
            let pkgver = step.record.pkgver();
            let Some(expected) = archive_hashes.get(&pkgver) else { continue };
            let path = self.archive_path(&step.record);
            let actual = sha256_file(&path)?;
            if &actual != expected {
                self.emit_state(
                    StateTag::VerifyFail,
                    "archive hash mismatch",
                    Some(&step.record.key.name),
                    Some(&step.record.key.version),
                    None,
                );
                let _ = std::fs::remove_file(&path);
                return Err(Error::VerifyFail { pkgver, expected: expected.clone(), actual });
            }
        }
        Ok(())
    }

    fn run_phase(&mut self, ordered: &[TransactionStep]) -> Result<ExecutionReport> {
        self.emit_state(StateTag::TransRun, "starting run phase", None, None, None);
        let mut report = ExecutionReport::default();

        for step in ordered {
            match step.action {
                StepAction::Remove => self.remove_package(step, &mut report)?,
                StepAction::Install | StepAction::Update => self.unpack_package(step, &mut report)?,
                StepAction::Configure => {}
            }
        }
        Ok(report)
    }

    fn ensure_state(&mut self, name: &str, target: PackageState) -> Result<()> {
        if self.db.get(name).map(|p| p.state) == Some(target) {
            return Ok(());
        }
        self.db.set_state(name, target)?;
        Ok(())
    }

    fn remove_package(&mut self, step: &TransactionStep, report: &mut ExecutionReport) -> Result<()> {
        let name = step.record.key.name.clone();
        let Some(installed) = self.db.get(&name).cloned() else {
            debug!(%name, "remove target already absent, nothing to do");
            return Ok(());
        };

        self.emit_state(StateTag::TransRun, "removing package", Some(&name), Some(&installed.record.key.version), None);

        run_remove_script(&self.config.rootdir, &installed.record, "pre").map_err(|message| Error::RemoveFail { pkgver: installed.record.pkgver(), message })?;

        for file in &installed.record.files {
            let path = self.config.rootdir.join(file.path.trim_start_matches('/'));
            if !path.exists() {
                continue;
            }
            if !self.config.force_remove {
                match sha256_file(&path) {
                    Ok(actual) if actual == file.sha256 => {}
                    _ => {
                        self.emit_state(StateTag::RemoveFileHashFail, "file hash mismatch during removal, skipped", Some(&name), None, None);
                        continue;
                    }
                }
            }
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove file");
            }
        }

        for (link_path, _) in &installed.record.links {
            let path = self.config.rootdir.join(link_path.trim_start_matches('/'));
            let _ = std::fs::remove_file(&path);
        }

        let mut dirs = installed.record.dirs.clone();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.matches('/').count()));
        for dir in &dirs {
            let path = self.config.rootdir.join(dir.trim_start_matches('/'));
            let _ = std::fs::remove_dir(&path);
        }

        run_remove_script(&self.config.rootdir, &installed.record, "post").map_err(|message| Error::RemoveFail { pkgver: installed.record.pkgver(), message })?;

        self.ensure_state(&name, PackageState::HalfRemoved)?;
        let meta_dir = self.config.rootdir.join(METADATA_DIR).join(&name);
        let _ = std::fs::remove_dir_all(&meta_dir);
        self.ensure_state(&name, PackageState::NotInstalled)?;
        self.db.remove(&name);

        report.removed.push(name);
        Ok(())
    }

    fn unpack_package(&mut self, step: &TransactionStep, report: &mut ExecutionReport) -> Result<()> {
        let name = step.record.key.name.clone();
        let pkgver = step.record.pkgver();
        let automatic = step.reason != "requested";
        let previous: Option<InstalledPackage> = self.db.get(&name).cloned();

        if let Some(prev) = &previous {
            if prev.record.pkgver() == pkgver && prev.state == PackageState::Unpacked {
                debug!(%pkgver, "already unpacked, resuming at configure phase");
                return Ok(());
            }
        }

        match &previous {
            None => self.db.insert(step.record.clone(), automatic),
            Some(p) if p.record.pkgver() != pkgver => {
                self.db.remove(&name);
                self.db.insert(step.record.clone(), automatic);
            }
            Some(_) => {}
        }

        self.ensure_state(&name, PackageState::HalfUnpacked)?;

        let archive_path = self.archive_path(&step.record);
        let archive = PackageArchive::open(&archive_path)?;
        let payload = archive.payload();
        let entry_count = payload.len();

        // A failing entry leaves the package at HalfUnpacked (already set
        // above): the spec's unpack-failure outcome is "leave package in
        // HALF_UNPACKED", not a distinct failure state, so none of the
        // failure points below change the persisted state.
        for (index, (header, data)) in payload.iter().enumerate() {
            if self
                .callbacks
                .unpack(UnpackProgress { pkgver: &pkgver, entry_path: &header.path, entry_index: index, entry_count })
                .is_abort()
            {
                return Err(Error::Cancelled { pkgver });
            }

            let rel = relative_entry_path(header);
            let target = self.config.rootdir.join(&rel);

            let fail = |message: String| Error::UnpackFail { pkgver: pkgver.clone(), path: target.clone(), message };

            if header.is_dir {
                std::fs::create_dir_all(&target).map_err(|e| fail(e.to_string()))?;
                continue;
            }

            if header.is_symlink {
                if let Some(parent) = target.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let _ = std::fs::remove_file(&target);
                if let Some(link_target) = &header.link_target {
                    symlink(link_target, &target).map_err(|e| fail(e.to_string()))?;
                }
                continue;
            }

            let is_conf = step.record.conf_files.iter().any(|f| f.path.trim_start_matches('/') == rel);
            if is_conf {
                self.merge_conf_file(step, &previous, &rel, data, &target)?;
                continue;
            }

            write_atomic(&target, data).map_err(|e| fail(e.to_string()))?;
        }

        if let Some(prev) = &previous {
            if prev.record.pkgver() != pkgver {
                let new_paths: std::collections::BTreeSet<&str> = step.record.files.iter().map(|f| f.path.as_str()).collect();
                for old_file in &prev.record.files {
                    if !new_paths.contains(old_file.path.as_str()) {
                        let path = self.config.rootdir.join(old_file.path.trim_start_matches('/'));
                        let _ = std::fs::remove_file(&path);
                    }
                }
            }
        }

        self.ensure_state(&name, PackageState::Unpacked)?;

        match step.action {
            StepAction::Install => report.installed.push(name),
            StepAction::Update => report.updated.push(name),
            StepAction::Configure | StepAction::Remove => {}
        }
        Ok(())
    }

    fn merge_conf_file(&self, step: &TransactionStep, previous: &Option<InstalledPackage>, rel: &str, data: &[u8], target: &Path) -> Result<()> {
        let new_hash = sha256_bytes(data);
        let original_hash = previous.as_ref().and_then(|p| p.record.conf_files.iter().find(|f| f.path.trim_start_matches('/') == rel).map(|f| f.sha256.clone()));
        let current_hash = if target.exists() { Some(sha256_file(target)?) } else { None };

        let hashes = ConfFileHashes { original: original_hash.as_deref(), current: current_hash.as_deref(), new: &new_hash };
        let action = config_merge::decide(&hashes, target, &step.record.key.version);

        let description = match &action {
            ConfFileAction::InstallNew => "config file installed",
            ConfFileAction::KeepCurrent => "config file left untouched, user edit preserved",
            ConfFileAction::InstallAlongside(_) => "config file diverged, new version installed alongside",
        };
        self.emit_state(StateTag::ConfigFile, description, Some(&step.record.key.name), Some(&step.record.key.version), None);

        match action {
            ConfFileAction::InstallNew => write_atomic(target, data).map_err(|e| Error::UnpackFail { pkgver: step.record.pkgver(), path: target.to_path_buf(), message: e.to_string() })?,
            ConfFileAction::KeepCurrent => {}
            ConfFileAction::InstallAlongside(path) => {
                write_atomic(&path, data).map_err(|e| Error::UnpackFail { pkgver: step.record.pkgver(), path: path.clone(), message: e.to_string() })?;
            }
        }
        Ok(())
    }

    fn configure_phase(&mut self, report: &mut ExecutionReport) -> Result<()> {
        self.emit_state(StateTag::TransConfigure, "starting configure phase", None, None, None);

        // A package left in ConfigureFail by a previous run is retried
        // here too: reset it to Unpacked before running the script so it
        // is never stuck on a state no later `execute()` call selects.
        let candidates: Vec<String> = self
            .db
            .foreach()
            .filter(|p| {
                p.state == PackageState::Unpacked
                    || p.state == PackageState::ConfigureFail
                    || (self.config.force_configure && p.state == PackageState::Installed)
            })
            .map(|p| p.record.key.name.clone())
            .collect();

        for name in candidates {
            let Some(pkg) = self.db.get(&name).cloned() else { continue };
            let version = pkg.record.key.version.clone();
            let is_update = pkg.state == PackageState::Installed;
            let retryable = matches!(pkg.state, PackageState::Unpacked | PackageState::ConfigureFail);

            if pkg.state == PackageState::ConfigureFail {
                self.db.set_state(&name, PackageState::Unpacked)?;
            }

            if self.emit_state(StateTag::TransConfigure, "running install script", Some(&name), Some(&version), None).is_abort() {
                return Err(Error::Cancelled { pkgver: pkg.record.pkgver() });
            }

            match run_install_script(&self.config.rootdir, &pkg.record, is_update) {
                Ok(()) => {
                    if retryable {
                        self.db.set_state(&name, PackageState::Installed)?;
                        report.configured.push(name);
                    }
                }
                Err(message) => {
                    self.emit_state(StateTag::ConfigureFail, &message, Some(&name), Some(&version), Some(&message));
                    if retryable {
                        self.db.set_state(&name, PackageState::ConfigureFail)?;
                    }
                    return Err(Error::ConfigureFail { pkgver: pkg.record.pkgver(), message });
                }
            }
        }
        Ok(())
    }
}

fn relative_entry_path(header: &EntryHeader) -> String {
    header.path.to_string_lossy().trim_start_matches("./").trim_start_matches('/').to_string()
}

fn write_atomic(target: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = match target.file_name() {
        Some(name) => {
            let mut os = name.to_os_string();
            os.push(".xbps-new");
            target.with_file_name(os)
        }
        None => target.to_path_buf(),
    };
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, target)?;
    Ok(())
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "symlinks require a unix target"))
}

fn run_install_script(rootdir: &Path, record: &PackageRecord, is_update: bool) -> std::result::Result<(), String> {
    let script = rootdir.join(METADATA_DIR).join(&record.key.name).join("INSTALL");
    if !script.exists() {
        return Ok(());
    }
    let status = std::process::Command::new(&script)
        .arg("post")
        .env("ROOTDIR", rootdir)
        .env("PKGNAME", &record.key.name)
        .env("VERSION", &record.key.version)
        .env("ACTION", "post")
        .env("UPDATE", if is_update { "yes" } else { "no" })
        .status()
        .map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("INSTALL script exited with {status}"))
    }
}

fn run_remove_script(rootdir: &Path, record: &PackageRecord, action: &str) -> std::result::Result<(), String> {
    let script = rootdir.join(METADATA_DIR).join(&record.key.name).join("REMOVE");
    if !script.exists() {
        return Ok(());
    }
    let status = std::process::Command::new(&script)
        .arg(action)
        .env("ROOTDIR", rootdir)
        .env("PKGNAME", &record.key.name)
        .env("VERSION", &record.key.version)
        .env("ACTION", action)
        .status()
        .map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("REMOVE script ({action}) exited with {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_config_default_clamps_workers() {
        let config = ExecutorConfig::default();
        assert!(config.download_workers >= 1 && config.download_workers <= 8);
    }

    #[test]
    fn relative_entry_path_strips_dot_slash() {
        let header = EntryHeader {
            path: PathBuf::from("./usr/bin/app"),
            size: 0,
            mode: 0o644,
            link_target: None,
            is_dir: false,
            is_symlink: false,
        };
        assert_eq!(relative_entry_path(&header), "usr/bin/app");
    }

    #[test]
    fn write_atomic_creates_parents_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/file.txt");
        write_atomic(&target, b"hello").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
        assert!(!target.with_file_name("file.txt.xbps-new").exists());
    }

    struct NullTransport;

    impl Transport for NullTransport {
        fn fetch(
            &self,
            _url: &str,
            _target_path: &Path,
            _if_newer_than: Option<std::time::SystemTime>,
            _if_size: Option<u64>,
            _on_progress: Option<&xbps_downloader::FetchCallback<'_>>,
        ) -> xbps_downloader::Result<xbps_downloader::FetchOutcome> {
            unimplemented!("configure_phase never fetches")
        }
    }

    fn bare_record(name: &str) -> PackageRecord {
        PackageRecord {
            key: xbps_core::package::PackageKey { name: name.to_string(), version: "1.0".to_string(), revision: 1 },
            dependencies: Vec::new(),
            provides: Default::default(),
            conflicts: Vec::new(),
            files: Vec::new(),
            dirs: Vec::new(),
            links: Vec::new(),
            conf_files: Vec::new(),
            installed_size: 0,
            filename_size: 0,
            arch: None,
            repository: None,
        }
    }

    #[test]
    fn configure_phase_retries_a_package_left_in_configure_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = PackageDatabase::load(dir.path().join("pkgdb.plist"), 100).unwrap();
        db.insert(bare_record("foo"), false);
        db.set_state("foo", PackageState::HalfUnpacked).unwrap();
        db.set_state("foo", PackageState::Unpacked).unwrap();
        db.set_state("foo", PackageState::ConfigureFail).unwrap();

        let config = ExecutorConfig { rootdir: dir.path().to_path_buf(), ..ExecutorConfig::default() };
        let mut handle = Handle::new(RepositoryPool::new(), db, NullTransport, config);

        let mut report = ExecutionReport::default();
        handle.configure_phase(&mut report).unwrap();

        assert_eq!(handle.db.get("foo").unwrap().state, PackageState::Installed);
        assert_eq!(report.configured, vec!["foo".to_string()]);
    }
}
