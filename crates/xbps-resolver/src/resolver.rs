//! Dependency closure resolution: turns seed operations into a
//! [`TransactionDocument`] of steps, missing dependencies, and conflicts.
//!
//! Resolution is deterministic and closure-based, not SAT-based: every
//! seed candidate is expanded breadth-first against the repository pool
//! and the local pkgdb until a fixed point is reached. The steps bag is
//! unordered; sorting into an executable order is `xbps-toposort`'s job.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use xbps_core::compare_pkgver;
use xbps_core::package::{PackageRecord, PackageState};
use xbps_core::version::{DepAtom, Pkgver};
use xbps_pkgdb::PackageDatabase;
use xbps_repository::{FindKind, RepositoryPool};

/// One requested change, as supplied by the caller (CLI or embedder).
#[derive(Debug, Clone)]
pub enum SeedOp {
    Install(String),
    Update(String),
    Remove(String),
    Autoremove,
}

/// What a transaction step does to the on-disk package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Install,
    Update,
    Configure,
    Remove,
}

/// One entry in the steps bag, collected unordered during resolution.
#[derive(Debug, Clone)]
pub struct TransactionStep {
    pub record: PackageRecord,
    pub action: StepAction,
    pub reason: String,
}

/// The resolver's output: an unordered bag of steps plus whatever kept
/// the transaction from being fully satisfiable.
#[derive(Debug, Clone, Default)]
pub struct TransactionDocument {
    pub steps: Vec<TransactionStep>,
    pub missing: Vec<String>,
    pub conflicts: Vec<(String, String)>,
    pub download_size: u64,
    pub installed_size_delta: i64,
}

impl TransactionDocument {
    #[must_use]
    pub fn is_satisfiable(&self) -> bool {
        self.missing.is_empty() && self.conflicts.is_empty()
    }
}

/// Render a `DepAtom` back into a pattern string usable against the
/// pool's `find_*` family. `DepAtom` has no such method of its own since
/// repositories are the only caller that needs it.
fn atom_pattern(atom: &DepAtom) -> (String, FindKind) {
    match atom {
        DepAtom::Name(name) => (name.clone(), FindKind::ByName),
        DepAtom::Glob(pattern) => (pattern.clone(), FindKind::ByPattern),
        DepAtom::Relational { name, op_raw, version } => {
            (format!("{name}{op_raw}{version}"), FindKind::ByPattern)
        }
    }
}

fn atom_name(atom: &DepAtom) -> &str {
    match atom.name() {
        Some(name) => name,
        None => match atom {
            DepAtom::Glob(pattern) => pattern.split(['>', '<', '=', '*', '?']).next().unwrap_or(pattern),
            DepAtom::Name(_) | DepAtom::Relational { .. } => unreachable!("name() covers these variants"),
        },
    }
}

fn find_pool_candidate(pool: &RepositoryPool, atom: &DepAtom) -> Option<PackageRecord> {
    let (pattern, kind) = atom_pattern(atom);
    pool.find_exact(&pattern)
        .or_else(|| pool.find_best(&pattern, kind))
        .or_else(|| pool.find_virtualpkg_conf(&pattern))
        .or_else(|| pool.find_virtualpkg(&pattern, kind))
        .cloned()
}

/// Resolve a batch of seed operations into a transaction document.
///
/// # Errors
/// Returns an error for any rejection that is reported to the caller
/// directly rather than accumulated on the document (`ALREADY_INSTALLED`,
/// `UP_TO_DATE`, `NOT_INSTALLED`, `NO_REPOSITORIES`).
pub fn resolve(seeds: &[SeedOp], pool: &RepositoryPool, db: &PackageDatabase) -> Result<TransactionDocument> {
    if pool.repositories().is_empty() && seeds.iter().any(|s| matches!(s, SeedOp::Install(_) | SeedOp::Update(_))) {
        return Err(Error::NoRepositories);
    }

    let mut unsorted: BTreeMap<String, TransactionStep> = BTreeMap::new();
    let mut removing: BTreeSet<String> = BTreeSet::new();
    let mut missing = Vec::new();

    for seed in seeds {
        match seed {
            SeedOp::Install(pattern) => {
                let candidate = pool
                    .find_install_candidate(pattern)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(pattern.clone()))?;
                let name = candidate.key.name.clone();
                if db.contains(&name) {
                    return Err(Error::AlreadyInstalled(name));
                }
                unsorted.insert(
                    name.clone(),
                    TransactionStep { record: candidate, action: StepAction::Install, reason: "requested".to_string() },
                );
            }
            SeedOp::Update(name) => {
                let candidate = pool
                    .find_best(name, FindKind::ByName)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(name.clone()))?;
                let installed = db.get(name).ok_or_else(|| Error::NotInstalled(name.clone()))?;
                let candidate_pkgver = Pkgver::parse(&candidate.pkgver())?;
                let installed_pkgver = Pkgver::parse(&installed.record.pkgver())?;
                if compare_pkgver(&candidate_pkgver, &installed_pkgver) != std::cmp::Ordering::Greater {
                    return Err(Error::UpToDate(name.clone()));
                }
                unsorted.insert(
                    name.clone(),
                    TransactionStep { record: candidate, action: StepAction::Update, reason: "requested".to_string() },
                );
            }
            SeedOp::Remove(name) => {
                let installed = db.get(name).ok_or_else(|| Error::NotInstalled(name.clone()))?;
                removing.insert(name.clone());
                unsorted.insert(
                    name.clone(),
                    TransactionStep {
                        record: installed.record.clone(),
                        action: StepAction::Remove,
                        reason: "requested".to_string(),
                    },
                );
            }
            SeedOp::Autoremove => {
                for orphan in db.orphans() {
                    let name = orphan.record.key.name.clone();
                    removing.insert(name.clone());
                    unsorted.insert(
                        name.clone(),
                        TransactionStep {
                            record: orphan.record.clone(),
                            action: StepAction::Remove,
                            reason: "orphaned dependency".to_string(),
                        },
                    );
                }
            }
        }
    }

    // Closure expansion: enumerate dependencies of every pending
    // install/update candidate until no new step is added.
    loop {
        let pending: Vec<PackageRecord> = unsorted
            .values()
            .filter(|s| s.action == StepAction::Install || s.action == StepAction::Update)
            .map(|s| s.record.clone())
            .collect();

        let mut added = false;
        for record in &pending {
            for atom in &record.dependencies {
                let dep_name = atom_name(atom).to_string();
                if unsorted.contains_key(&dep_name) {
                    continue;
                }
                if let Some(installed) = db.get(&dep_name) {
                    if !removing.contains(&dep_name)
                        && matches!(installed.state, PackageState::Installed | PackageState::Unpacked)
                    {
                        continue;
                    }
                }
                if satisfied_by_installed_provides(db, atom, &removing) {
                    continue;
                }

                match find_pool_candidate(pool, atom) {
                    Some(candidate) => {
                        let reason = match db.get(&dep_name).map(|p| p.state) {
                            None | Some(PackageState::HalfUnpacked) => "install",
                            Some(PackageState::Unpacked) => "configure",
                            _ => "install",
                        };
                        let action = if reason == "configure" { StepAction::Configure } else { StepAction::Install };
                        debug!(dep = %dep_name, %reason, "resolved dependency");
                        unsorted.insert(
                            dep_name.clone(),
                            TransactionStep {
                                record: candidate,
                                action,
                                reason: format!("dependency of {}", record.key.name),
                            },
                        );
                        added = true;
                    }
                    None => {
                        if !missing.contains(&dep_name) {
                            missing.push(dep_name);
                        }
                    }
                }
            }
        }

        if !added {
            break;
        }
    }

    // Conflict detection: every non-remove step's conflicts checked
    // against other steps and the pkgdb minus the to-be-removed set.
    let mut conflicts = Vec::new();
    for step in unsorted.values().filter(|s| s.action != StepAction::Remove) {
        for atom in &step.record.conflicts {
            let other_name = atom_name(atom);
            if let Some(other_step) = unsorted.get(other_name) {
                if other_step.action != StepAction::Remove {
                    conflicts.push((step.record.key.name.clone(), other_name.to_string()));
                }
            } else if let Some(installed) = db.get(other_name) {
                let installed_pkgver = Pkgver::parse(&installed.record.pkgver())
                    .expect("PackageRecord::pkgver() always renders a valid pkgver");
                if !removing.contains(other_name)
                    && matches!(atom.matches(&installed_pkgver), xbps_core::version::MatchResult::Matches)
                {
                    conflicts.push((step.record.key.name.clone(), other_name.to_string()));
                }
            }
        }
    }

    let download_size: u64 = unsorted
        .values()
        .filter(|s| s.action != StepAction::Configure && s.action != StepAction::Remove)
        .map(|s| s.record.filename_size)
        .sum();

    let installed_size_delta: i64 = unsorted
        .values()
        .map(|s| match s.action {
            StepAction::Install | StepAction::Configure => i64::try_from(s.record.installed_size).unwrap_or(i64::MAX),
            StepAction::Update => {
                let new_size = i64::try_from(s.record.installed_size).unwrap_or(i64::MAX);
                let old_size = db
                    .get(&s.record.key.name)
                    .map(|p| i64::try_from(p.record.installed_size).unwrap_or(i64::MAX))
                    .unwrap_or(0);
                new_size - old_size
            }
            StepAction::Remove => -i64::try_from(s.record.installed_size).unwrap_or(i64::MAX),
        })
        .sum();

    Ok(TransactionDocument {
        steps: unsorted.into_values().collect(),
        missing,
        conflicts,
        download_size,
        installed_size_delta,
    })
}

fn satisfied_by_installed_provides(db: &PackageDatabase, atom: &DepAtom, removing: &BTreeSet<String>) -> bool {
    db.foreach().any(|p| {
        !removing.contains(&p.record.key.name)
            && matches!(p.state, PackageState::Installed | PackageState::Unpacked)
            && p.record.provides.iter().any(|provided| {
                Pkgver::parse(provided).is_ok_and(|pv| matches!(atom.matches(&pv), xbps_core::version::MatchResult::Matches))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use xbps_core::package::PackageKey;
    use xbps_repository::Repository;

    fn record(name: &str, version: &str, deps: &[&str], conflicts: &[&str]) -> PackageRecord {
        PackageRecord {
            key: PackageKey { name: name.to_string(), version: version.to_string(), revision: 1 },
            dependencies: deps.iter().map(|d| DepAtom::parse(d).unwrap()).collect(),
            provides: BTreeSet::new(),
            conflicts: conflicts.iter().map(|d| DepAtom::parse(d).unwrap()).collect(),
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

    fn empty_db() -> PackageDatabase {
        let dir = tempfile::tempdir().unwrap();
        PackageDatabase::load(dir.path().join("pkgdb.plist"), 100).unwrap()
    }

    #[test]
    fn install_pulls_in_transitive_dependency() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new(
            "repo1",
            vec![record("app", "1.0", &["lib"], &[]), record("lib", "1.0", &[], &[])],
        ));
        let db = empty_db();
        let doc = resolve(&[SeedOp::Install("app".to_string())], &pool, &db).unwrap();
        assert!(doc.is_satisfiable());
        let names: BTreeSet<_> = doc.steps.iter().map(|s| s.record.key.name.clone()).collect();
        assert!(names.contains("app"));
        assert!(names.contains("lib"));
    }

    #[test]
    fn missing_dependency_reported_on_document() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new("repo1", vec![record("app", "1.0", &["ghost"], &[])]));
        let db = empty_db();
        let doc = resolve(&[SeedOp::Install("app".to_string())], &pool, &db).unwrap();
        assert!(!doc.is_satisfiable());
        assert_eq!(doc.missing, vec!["ghost".to_string()]);
    }

    #[test]
    fn already_installed_is_rejected() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new("repo1", vec![record("app", "1.0", &[], &[])]));
        let mut db = empty_db();
        db.insert(record("app", "1.0", &[], &[]), false);
        db.set_state("app", PackageState::Installed).unwrap();
        let err = resolve(&[SeedOp::Install("app".to_string())], &pool, &db).unwrap_err();
        assert!(matches!(err, Error::AlreadyInstalled(name) if name == "app"));
    }

    #[test]
    fn update_rejects_when_already_up_to_date() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new("repo1", vec![record("app", "1.0", &[], &[])]));
        let mut db = empty_db();
        db.insert(record("app", "1.0", &[], &[]), false);
        db.set_state("app", PackageState::Installed).unwrap();
        let err = resolve(&[SeedOp::Update("app".to_string())], &pool, &db).unwrap_err();
        assert!(matches!(err, Error::UpToDate(name) if name == "app"));
    }

    #[test]
    fn remove_of_uninstalled_package_is_rejected() {
        let pool = RepositoryPool::new();
        let db = empty_db();
        let err = resolve(&[SeedOp::Remove("app".to_string())], &pool, &db).unwrap_err();
        assert!(matches!(err, Error::NotInstalled(name) if name == "app"));
    }

    #[test]
    fn conflicting_install_is_reported() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new(
            "repo1",
            vec![record("app", "1.0", &[], &["other"]), record("other", "1.0", &[], &[])],
        ));
        let mut db = empty_db();
        db.insert(record("other", "1.0", &[], &[]), false);
        db.set_state("other", PackageState::Installed).unwrap();
        let doc = resolve(&[SeedOp::Install("app".to_string())], &pool, &db).unwrap();
        assert!(!doc.conflicts.is_empty());
    }

    #[test]
    fn autoremove_targets_orphaned_automatic_packages() {
        let pool = RepositoryPool::new();
        let mut db = empty_db();
        db.insert(record("lib", "1.0", &[], &[]), true);
        db.set_state("lib", PackageState::Installed).unwrap();
        let doc = resolve(&[SeedOp::Autoremove], &pool, &db).unwrap();
        assert_eq!(doc.steps.len(), 1);
        assert_eq!(doc.steps[0].action, StepAction::Remove);
    }

    #[test]
    fn no_repositories_rejects_install() {
        let pool = RepositoryPool::new();
        let db = empty_db();
        let err = resolve(&[SeedOp::Install("app".to_string())], &pool, &db).unwrap_err();
        assert!(matches!(err, Error::NoRepositories));
    }
}
