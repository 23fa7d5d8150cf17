//! The local package database: the authoritative record of what is
//! installed, persisted as a single `pkgdb.plist` document and flushed
//! atomically (component component D in the system overview).

use crate::atomic::{AtomicReader, AtomicWriter};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xbps_core::package::{FileEntry, InstalledPackage, PackageKey, PackageRecord, PackageState};
use xbps_core::plist::Plist;
use xbps_core::version::DepAtom;

/// In-memory view of the pkgdb, backed by atomic plist flushes.
///
/// Mutations are buffered; call [`PackageDatabase::flush`] to persist, or
/// rely on the automatic flush every `flush_frequency` mutations (mirrors
/// the `TransactionFrequencyFlush` config key).
#[derive(Debug)]
pub struct PackageDatabase {
    path: PathBuf,
    packages: BTreeMap<String, InstalledPackage>,
    flush_frequency: usize,
    dirty_mutations: usize,
}

impl PackageDatabase {
    /// Load a pkgdb from disk, or start empty if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>, flush_frequency: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = AtomicReader::new(&path)?;
        let packages = if reader.exists() {
            let xml = reader.read_string()?;
            let doc = Plist::from_xml(&xml)?;
            parse_db(&doc)?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), count = packages.len(), "loaded pkgdb");

        Ok(Self {
            path,
            packages,
            flush_frequency: flush_frequency.max(1),
            dirty_mutations: 0,
        })
    }

    /// Look up an installed package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }

    /// Look up an installed package by its full pkgver.
    #[must_use]
    pub fn get_by_pkgver(&self, pkgver: &str) -> Option<&InstalledPackage> {
        self.packages.values().find(|p| p.record.pkgver() == pkgver)
    }

    /// Whether a package name is registered, in any state.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Insert or replace a package record, entering `NotInstalled`. Callers
    /// drive the state machine forward with [`PackageDatabase::set_state`].
    pub fn insert(&mut self, record: PackageRecord, automatic: bool) {
        let name = record.key.name.clone();
        self.packages.insert(
            name,
            InstalledPackage {
                record,
                state: PackageState::NotInstalled,
                automatic,
            },
        );
        self.note_mutation();
    }

    /// Remove a package from the database entirely. Call only once its
    /// state has reached `NotInstalled` via [`PackageDatabase::set_state`].
    pub fn remove(&mut self, name: &str) -> Option<InstalledPackage> {
        let removed = self.packages.remove(name);
        if removed.is_some() {
            self.note_mutation();
        }
        removed
    }

    /// Advance a package's lifecycle state.
    ///
    /// # Errors
    /// Returns [`Error::BadStateTransition`] if the transition is not
    /// permitted by the state machine, or [`Error::NotFound`] if the
    /// package is not registered.
    pub fn set_state(&mut self, name: &str, next: PackageState) -> Result<()> {
        let pkg = self
            .packages
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if !pkg.state.can_transition_to(next) {
            return Err(Error::BadStateTransition {
                pkgname: name.to_string(),
                from: pkg.state,
                to: next,
            });
        }
        pkg.state = next;
        self.note_mutation();
        Ok(())
    }

    /// Toggle whether a package was installed automatically (as a
    /// dependency) versus explicitly requested.
    pub fn set_automatic(&mut self, name: &str, automatic: bool) -> Result<()> {
        let pkg = self
            .packages
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        pkg.automatic = automatic;
        self.note_mutation();
        Ok(())
    }

    /// Visit every installed package in name order.
    pub fn foreach(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.packages.values()
    }

    /// Visit every installed package in reverse name order, the order
    /// `autoremove`/`remove` walk dependents before dependencies.
    pub fn foreach_reverse(&self) -> impl DoubleEndedIterator<Item = &InstalledPackage> {
        self.packages.values().rev()
    }

    /// Packages installed automatically that no non-orphan installed
    /// package depends on, transitively.
    ///
    /// An orphan that itself depends on another automatic package does
    /// not keep that dependency alive, so the candidate set is recomputed
    /// excluding already-found orphans until it stops growing.
    #[must_use]
    pub fn orphans(&self) -> Vec<&InstalledPackage> {
        let mut orphan_names: std::collections::HashSet<&str> = std::collections::HashSet::new();
        loop {
            let mut required: std::collections::HashSet<&str> = std::collections::HashSet::new();
            for pkg in self.packages.values() {
                if orphan_names.contains(pkg.record.key.name.as_str()) {
                    continue;
                }
                for dep in &pkg.record.dependencies {
                    if let Some(name) = dep.name() {
                        required.insert(name);
                    }
                }
            }

            let mut grew = false;
            for pkg in self.packages.values() {
                let name = pkg.record.key.name.as_str();
                if pkg.automatic && pkg.state == PackageState::Installed && !required.contains(name) && orphan_names.insert(name) {
                    grew = true;
                }
            }

            if !grew {
                break;
            }
        }

        self.packages.values().filter(|p| orphan_names.contains(p.record.key.name.as_str())).collect()
    }

    /// Number of registered packages, in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Force a flush regardless of the mutation counter.
    ///
    /// # Errors
    /// Returns an error if serialization or the atomic write fails.
    pub fn flush(&mut self) -> Result<()> {
        let doc = render_db(&self.packages);
        let xml = doc.to_xml();
        let mut writer = AtomicWriter::new(&self.path)?;
        writer.content(xml.into_bytes());
        let result = writer.commit()?;
        self.dirty_mutations = 0;
        info!(path = %self.path.display(), bytes = result.bytes_written, "flushed pkgdb");
        Ok(())
    }

    fn note_mutation(&mut self) {
        self.dirty_mutations += 1;
        if self.dirty_mutations >= self.flush_frequency {
            if let Err(err) = self.flush() {
                tracing::warn!(error = %err, "deferred pkgdb flush failed, will retry on next mutation");
            }
        }
    }
}

fn render_db(packages: &BTreeMap<String, InstalledPackage>) -> Plist {
    let mut dict = BTreeMap::new();
    for (name, pkg) in packages {
        dict.insert(name.clone(), render_installed(pkg));
    }
    Plist::Dict(dict)
}

fn render_installed(pkg: &InstalledPackage) -> Plist {
    let mut d = BTreeMap::new();
    d.insert("pkgname".to_string(), Plist::String(pkg.record.key.name.clone()));
    d.insert("version".to_string(), Plist::String(pkg.record.key.version.clone()));
    d.insert("revision".to_string(), Plist::Integer(i64::from(pkg.record.key.revision)));
    d.insert("state".to_string(), Plist::String(state_to_str(pkg.state).to_string()));
    d.insert("automatic-install".to_string(), Plist::Integer(i64::from(pkg.automatic)));
    d.insert(
        "run_depends".to_string(),
        Plist::Array(pkg.record.dependencies.iter().map(|d| Plist::String(d.render())).collect()),
    );
    d.insert(
        "provides".to_string(),
        Plist::Array(pkg.record.provides.iter().map(|p| Plist::String(p.clone())).collect()),
    );
    d.insert(
        "conf_files".to_string(),
        Plist::Array(pkg.record.conf_files.iter().map(render_file_entry).collect()),
    );
    d.insert(
        "files".to_string(),
        Plist::Array(pkg.record.files.iter().map(render_file_entry).collect()),
    );
    d.insert("installed_size".to_string(), Plist::Integer(pkg.record.installed_size as i64));
    Plist::Dict(d)
}

fn render_file_entry(f: &FileEntry) -> Plist {
    let mut d = BTreeMap::new();
    d.insert("file".to_string(), Plist::String(f.path.clone()));
    d.insert("sha256".to_string(), Plist::String(f.sha256.clone()));
    d.insert("size".to_string(), Plist::Integer(f.size as i64));
    Plist::Dict(d)
}

fn state_to_str(state: PackageState) -> &'static str {
    match state {
        PackageState::NotInstalled => "not-installed",
        PackageState::HalfUnpacked => "half-unpacked",
        PackageState::Unpacked => "unpacked",
        PackageState::Installed => "installed",
        PackageState::UnpackFail => "unpack-fail",
        PackageState::ConfigureFail => "configure-fail",
        PackageState::HalfRemoved => "half-removed",
    }
}

fn state_from_str(s: &str) -> Result<PackageState> {
    Ok(match s {
        "not-installed" => PackageState::NotInstalled,
        "half-unpacked" => PackageState::HalfUnpacked,
        "unpacked" => PackageState::Unpacked,
        "installed" => PackageState::Installed,
        "unpack-fail" => PackageState::UnpackFail,
        "configure-fail" => PackageState::ConfigureFail,
        "half-removed" => PackageState::HalfRemoved,
        other => return Err(Error::Core(xbps_core::Error::malformed_plist(format!("unknown state '{other}'"), None))),
    })
}

fn parse_db(doc: &Plist) -> Result<BTreeMap<String, InstalledPackage>> {
    let dict = doc.as_dict().ok_or_else(|| Error::Core(xbps_core::Error::malformed_plist("pkgdb root is not a dict", None)))?;
    let mut out = BTreeMap::new();
    for (name, node) in dict {
        out.insert(name.clone(), parse_installed(node)?);
    }
    Ok(out)
}

fn parse_installed(node: &Plist) -> Result<InstalledPackage> {
    let name = node.get("pkgname")?.as_str().unwrap_or_default().to_string();
    let version = node.get("version")?.as_str().unwrap_or_default().to_string();
    let revision = node.get("revision")?.as_integer().unwrap_or(0) as u32;
    let state = state_from_str(node.get("state")?.as_str().unwrap_or("not-installed"))?;
    let automatic = node.get("automatic-install")?.as_integer().unwrap_or(0) != 0;

    let dependencies = node
        .get("run_depends")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| p.as_str().and_then(DepAtom::parse))
        .collect();
    let provides = node
        .get("provides")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| p.as_str().map(str::to_string))
        .collect();
    let conf_files = node
        .get("conf_files")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(parse_file_entry)
        .collect();
    let files = node
        .get("files")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(parse_file_entry)
        .collect();
    let installed_size = node.get("installed_size")?.as_integer().unwrap_or(0) as u64;

    Ok(InstalledPackage {
        record: PackageRecord {
            key: PackageKey { name, version, revision },
            dependencies,
            provides,
            conflicts: vec![],
            files,
            dirs: vec![],
            links: vec![],
            conf_files,
            installed_size,
            filename_size: 0,
            arch: None,
            repository: None,
        },
        state,
        automatic,
    })
}

fn parse_file_entry(node: &Plist) -> Option<FileEntry> {
    Some(FileEntry {
        path: node.get("file").ok()?.as_str()?.to_string(),
        sha256: node.get("sha256").ok()?.as_str()?.to_string(),
        size: node.get("size").ok()?.as_integer()? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn record(name: &str) -> PackageRecord {
        PackageRecord {
            key: PackageKey {
                name: name.to_string(),
                version: "1.0".to_string(),
                revision: 1,
            },
            dependencies: vec![],
            provides: BTreeSet::new(),
            conflicts: vec![],
            files: vec![],
            dirs: vec![],
            links: vec![],
            conf_files: vec![],
            installed_size: 100,
            filename_size: 50,
            arch: None,
            repository: None,
        }
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let db = PackageDatabase::load(dir.path().join("pkgdb.plist"), 10).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn insert_flush_reload_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgdb.plist");
        let mut db = PackageDatabase::load(&path, 10).unwrap();
        db.insert(record("foo"), false);
        db.set_state("foo", PackageState::HalfUnpacked).unwrap();
        db.set_state("foo", PackageState::Unpacked).unwrap();
        db.set_state("foo", PackageState::Installed).unwrap();
        db.flush().unwrap();

        let reloaded = PackageDatabase::load(&path, 10).unwrap();
        let pkg = reloaded.get("foo").unwrap();
        assert_eq!(pkg.state, PackageState::Installed);
        assert_eq!(pkg.record.key.version, "1.0");
    }

    #[test]
    fn rejects_invalid_state_transition() {
        let dir = TempDir::new().unwrap();
        let mut db = PackageDatabase::load(dir.path().join("pkgdb.plist"), 10).unwrap();
        db.insert(record("foo"), false);
        let err = db.set_state("foo", PackageState::Installed).unwrap_err();
        assert!(matches!(err, Error::BadStateTransition { .. }));
    }

    #[test]
    fn auto_flush_after_frequency_reached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgdb.plist");
        let mut db = PackageDatabase::load(&path, 1).unwrap();
        db.insert(record("foo"), false);
        assert!(path.exists());
    }

    #[test]
    fn orphans_excludes_required_dependencies() {
        let dir = TempDir::new().unwrap();
        let mut db = PackageDatabase::load(dir.path().join("pkgdb.plist"), 10).unwrap();
        let mut leaf = record("leaf");
        let mut root = record("root");
        root.dependencies = vec![DepAtom::parse("leaf").unwrap()];
        db.insert(leaf.clone(), true);
        db.insert(root, false);
        db.set_state("leaf", PackageState::HalfUnpacked).unwrap();
        db.set_state("leaf", PackageState::Unpacked).unwrap();
        db.set_state("leaf", PackageState::Installed).unwrap();
        assert!(db.orphans().is_empty());

        leaf.key.name = "standalone".to_string();
        db.insert(leaf, true);
        db.set_state("standalone", PackageState::HalfUnpacked).unwrap();
        db.set_state("standalone", PackageState::Unpacked).unwrap();
        db.set_state("standalone", PackageState::Installed).unwrap();
        assert_eq!(db.orphans().len(), 1);
    }

    #[test]
    fn orphans_reaches_a_fixed_point_across_a_chain() {
        let dir = TempDir::new().unwrap();
        let mut db = PackageDatabase::load(dir.path().join("pkgdb.plist"), 10).unwrap();

        let b = record("b");
        let mut a = record("a");
        a.dependencies = vec![DepAtom::parse("b").unwrap()];

        for (rec, name) in [(b, "b"), (a, "a")] {
            db.insert(rec, true);
            db.set_state(name, PackageState::HalfUnpacked).unwrap();
            db.set_state(name, PackageState::Unpacked).unwrap();
            db.set_state(name, PackageState::Installed).unwrap();
        }

        let names: std::collections::BTreeSet<_> = db.orphans().into_iter().map(|p| p.record.key.name.clone()).collect();
        assert_eq!(names, ["a", "b"].into_iter().map(String::from).collect());
    }
}
