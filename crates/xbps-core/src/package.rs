//! In-memory package data model (component B).

use crate::version::DepAtom;
use std::collections::BTreeSet;

/// Identity triple: name, version, revision. `pkgver` is the canonical
/// rendering; the triple itself, not the repository it came from, is the
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub name: String,
    pub version: String,
    pub revision: u32,
}

impl PackageKey {
    /// Canonical `name-version_revision` rendering.
    #[must_use]
    pub fn pkgver(&self) -> String {
        format!("{}-{}_{}", self.name, self.version, self.revision)
    }
}

/// A file contributed by a package, with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

/// A package's complete metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub key: PackageKey,
    pub dependencies: Vec<DepAtom>,
    pub provides: BTreeSet<String>,
    pub conflicts: Vec<DepAtom>,
    pub files: Vec<FileEntry>,
    pub dirs: Vec<String>,
    pub links: Vec<(String, String)>,
    pub conf_files: Vec<FileEntry>,
    pub installed_size: u64,
    pub filename_size: u64,
    pub arch: Option<String>,
    pub repository: Option<String>,
}

impl PackageRecord {
    /// Canonical `name-version_revision` rendering.
    #[must_use]
    pub fn pkgver(&self) -> String {
        self.key.pkgver()
    }

    /// Whether this record's architecture is compatible with `target_arch`.
    /// An unset arch, or the literal `noarch`, is always compatible.
    #[must_use]
    pub fn arch_compatible(&self, target_arch: &str) -> bool {
        match &self.arch {
            None => true,
            Some(a) if a == "noarch" => true,
            Some(a) => a == target_arch,
        }
    }
}

/// Lifecycle state of an installed package (component D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    NotInstalled,
    HalfUnpacked,
    Unpacked,
    Installed,
    UnpackFail,
    ConfigureFail,
    HalfRemoved,
}

impl PackageState {
    /// Whether `self -> next` is a permitted transition in the state
    /// machine described by the transaction executor.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use PackageState::{ConfigureFail, HalfRemoved, HalfUnpacked, Installed, NotInstalled, Unpacked, UnpackFail};
        matches!(
            (self, next),
            (NotInstalled, HalfUnpacked)
                | (HalfUnpacked, Unpacked)
                | (HalfUnpacked, UnpackFail)
                | (UnpackFail, HalfUnpacked)
                | (Unpacked, Installed)
                | (Unpacked, ConfigureFail)
                | (ConfigureFail, Unpacked)
                | (Installed, HalfRemoved)
                | (Unpacked, HalfRemoved)
                | (HalfUnpacked, HalfRemoved)
                | (HalfRemoved, NotInstalled)
        )
    }
}

/// A record registered in the local package database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub record: PackageRecord,
    pub state: PackageState,
    pub automatic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: &str, v: &str, r: u32) -> PackageKey {
        PackageKey {
            name: n.to_string(),
            version: v.to_string(),
            revision: r,
        }
    }

    #[test]
    fn pkgver_renders_canonically() {
        assert_eq!(key("foo", "1.0", 2).pkgver(), "foo-1.0_2");
    }

    #[test]
    fn noarch_is_always_compatible() {
        let mut rec = sample_record();
        rec.arch = Some("noarch".to_string());
        assert!(rec.arch_compatible("x86_64"));
    }

    #[test]
    fn mismatched_arch_is_incompatible() {
        let mut rec = sample_record();
        rec.arch = Some("aarch64".to_string());
        assert!(!rec.arch_compatible("x86_64"));
    }

    #[test]
    fn state_machine_rejects_skipped_transitions() {
        assert!(!PackageState::NotInstalled.can_transition_to(PackageState::Installed));
        assert!(PackageState::NotInstalled.can_transition_to(PackageState::HalfUnpacked));
        assert!(PackageState::HalfUnpacked.can_transition_to(PackageState::Unpacked));
    }

    fn sample_record() -> PackageRecord {
        PackageRecord {
            key: key("foo", "1.0", 0),
            dependencies: vec![],
            provides: BTreeSet::new(),
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
}
