//! Builders for the records and stores that the resolver, pkgdb, and
//! transaction executor crates test against.

use std::collections::BTreeSet;
use xbps_core::package::{FileEntry, InstalledPackage, PackageKey, PackageRecord, PackageState};
use xbps_core::version::DepAtom;
use xbps_pkgdb::PackageDatabase;
use xbps_repository::{Repository, RepositoryPool};

/// Build a minimal `PackageRecord` with no dependencies, conflicts, or
/// files — the common case for resolver fixtures.
#[must_use]
pub fn record(name: &str, version: &str, revision: u32) -> PackageRecord {
    PackageRecord {
        key: PackageKey { name: name.to_string(), version: version.to_string(), revision },
        dependencies: Vec::new(),
        provides: BTreeSet::new(),
        conflicts: Vec::new(),
        files: Vec::new(),
        dirs: Vec::new(),
        links: Vec::new(),
        conf_files: Vec::new(),
        installed_size: 1024,
        filename_size: 512,
        arch: None,
        repository: None,
    }
}

/// Builder for a `PackageRecord`, for tests that need to set
/// dependencies, conflicts, or a file list.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    rec: PackageRecord,
}

impl RecordBuilder {
    #[must_use]
    pub fn new(name: &str, version: &str, revision: u32) -> Self {
        Self { rec: record(name, version, revision) }
    }

    #[must_use]
    pub fn depends_on(mut self, pattern: &str) -> Self {
        self.rec.dependencies.push(DepAtom::parse(pattern).expect("valid test dependency pattern"));
        self
    }

    #[must_use]
    pub fn conflicts_with(mut self, pattern: &str) -> Self {
        self.rec.conflicts.push(DepAtom::parse(pattern).expect("valid test conflict pattern"));
        self
    }

    #[must_use]
    pub fn provides(mut self, virtual_pkgver: &str) -> Self {
        self.rec.provides.insert(virtual_pkgver.to_string());
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, sha256: &str, size: u64) -> Self {
        self.rec.files.push(FileEntry { path: path.to_string(), sha256: sha256.to_string(), size });
        self
    }

    #[must_use]
    pub fn arch(mut self, arch: &str) -> Self {
        self.rec.arch = Some(arch.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> PackageRecord {
        self.rec
    }
}

/// Builder for a `RepositoryPool` seeded with one or more repositories'
/// worth of records.
#[derive(Debug, Default)]
pub struct PoolBuilder {
    pool: RepositoryPool,
}

impl PoolBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { pool: RepositoryPool::new() }
    }

    #[must_use]
    pub fn with_repository(mut self, uri: &str, records: Vec<PackageRecord>) -> Self {
        self.pool.add_repository(Repository::new(uri.to_string(), records));
        self
    }

    #[must_use]
    pub fn build(self) -> RepositoryPool {
        self.pool
    }
}

/// A scratch `PackageDatabase` backed by a fresh `TempDir`'s pkgdb file.
/// The `TempDir` is returned alongside so the caller keeps it alive for
/// the database's lifetime.
///
/// # Panics
/// Panics if the scratch directory or database cannot be created —
/// acceptable for test setup.
#[must_use]
pub fn scratch_db() -> (tempfile::TempDir, PackageDatabase) {
    let dir = tempfile::tempdir().expect("create scratch tempdir");
    let db = PackageDatabase::load(dir.path().join("pkgdb.plist"), 100).expect("load empty pkgdb");
    (dir, db)
}

/// Insert `record` into `db` and drive it through the state machine up
/// to `target`, as if it had gone through a real install.
///
/// # Panics
/// Panics if `target` is unreachable from `NotInstalled` by the normal
/// install chain (`HalfUnpacked -> Unpacked -> Installed`) — every
/// caller is expected to pass a state on that path.
pub fn install_into(db: &mut PackageDatabase, rec: PackageRecord, automatic: bool, target: PackageState) {
    let name = rec.key.name.clone();
    db.insert(rec, automatic);
    let chain = [PackageState::HalfUnpacked, PackageState::Unpacked, PackageState::Installed];
    for state in chain {
        db.set_state(&name, state).expect("install chain transition is valid for test fixtures");
        if state == target {
            return;
        }
    }
    assert_eq!(target, PackageState::Installed, "unreachable target state for install_into fixture");
}

#[must_use]
pub fn installed(rec: PackageRecord, automatic: bool) -> InstalledPackage {
    InstalledPackage { record: rec, state: PackageState::Installed, automatic }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_builder_sets_dependencies_and_conflicts() {
        let rec = RecordBuilder::new("app", "1.0", 1).depends_on("lib>=2.0").conflicts_with("oldapp").build();
        assert_eq!(rec.dependencies.len(), 1);
        assert_eq!(rec.conflicts.len(), 1);
    }

    #[test]
    fn pool_builder_builds_a_lookup_ready_pool() {
        let pool = PoolBuilder::new().with_repository("https://repo.example", vec![record("foo", "1.0", 1)]).build();
        assert!(pool.find_exact("foo-1.0_1").is_some());
    }

    #[test]
    fn scratch_db_starts_empty() {
        let (_dir, db) = scratch_db();
        assert!(db.is_empty());
    }
}
