//! Ordered repository pool and its find-dispatch primitives.
//!
//! The dispatch priority mirrors the original C implementation's
//! `repo_find_pkg`/`repo_find_best_pkg`/`repo_find_virtualpkg*` family: an
//! exact pkgver match, a pattern/name match against the pool in order, a
//! config-file virtual-package alias, then the provides index — each a
//! distinct pass over the pool, never blended together.

use std::collections::BTreeMap;
use xbps_core::{compare_pkgver, DepAtom, MatchResult, PackageRecord, Pkgver};

/// Whether a lookup treats its input as a constraint pattern or a bare
/// package name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKind {
    ByName,
    ByPattern,
}

/// One repository's package index plus its reverse `provides` index.
#[derive(Debug, Clone)]
pub struct Repository {
    pub uri: String,
    index: BTreeMap<String, PackageRecord>,
}

impl Repository {
    /// Build a repository from its already-parsed package records.
    #[must_use]
    pub fn new(uri: impl Into<String>, records: Vec<PackageRecord>) -> Self {
        let mut index = BTreeMap::new();
        for mut rec in records {
            rec.repository = None;
            index.insert(rec.key.name.clone(), rec);
        }
        Self {
            uri: uri.into(),
            index,
        }
    }

    /// All records in this repository's index.
    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.index.values()
    }

    fn find(&self, pattern: &str, kind: FindKind) -> Option<&PackageRecord> {
        match kind {
            FindKind::ByName => self.index.get(pattern),
            FindKind::ByPattern => {
                let atom = DepAtom::parse(pattern)?;
                self.index
                    .values()
                    .find(|r| matches!(atom.matches(&to_pkgver(r)), MatchResult::Matches))
            }
        }
    }

    fn find_exact(&self, pkgver: &str) -> Option<&PackageRecord> {
        self.index.values().find(|r| r.pkgver() == pkgver)
    }

    fn find_virtual(&self, pattern: &str, kind: FindKind) -> Option<&PackageRecord> {
        let atom = match kind {
            FindKind::ByName => DepAtom::Name(pattern.to_string()),
            FindKind::ByPattern => DepAtom::parse(pattern)?,
        };
        self.index.values().find(|r| {
            r.provides.iter().any(|provided| {
                Pkgver::parse(provided)
                    .is_ok_and(|pv| matches!(atom.matches(&pv), MatchResult::Matches))
            })
        })
    }
}

fn to_pkgver(rec: &PackageRecord) -> Pkgver {
    // PackageRecord already carries a parsed key; reconstruct a Pkgver view
    // for pattern matching without re-parsing its own rendering.
    Pkgver::parse(&rec.pkgver()).expect("PackageRecord::pkgver() always renders a valid pkgver")
}

/// An ordered collection of repositories, earlier entries winning ties.
#[derive(Debug, Clone, Default)]
pub struct RepositoryPool {
    repos: Vec<Repository>,
    /// Manual `virtualpkg` config aliases: virtual name -> real pkgver.
    virtualpkg_aliases: BTreeMap<String, String>,
}

impl RepositoryPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repository(&mut self, repo: Repository) {
        self.repos.push(repo);
    }

    /// Replace the repository at `repo.uri`, preserving its position, or
    /// append it if the pool does not yet carry that URI. Used by
    /// `sync_index` to refresh an already-loaded repository in place.
    pub fn replace_or_add(&mut self, repo: Repository) {
        if let Some(existing) = self.repos.iter_mut().find(|r| r.uri == repo.uri) {
            *existing = repo;
        } else {
            self.repos.push(repo);
        }
    }

    pub fn set_virtualpkg_aliases(&mut self, aliases: BTreeMap<String, String>) {
        self.virtualpkg_aliases = aliases;
    }

    #[must_use]
    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    /// First match across repositories in pool order.
    #[must_use]
    pub fn find_first(&self, pattern: &str, kind: FindKind) -> Option<&PackageRecord> {
        self.repos.iter().find_map(|r| r.find(pattern, kind))
    }

    /// Best (highest-version) match, visiting every repository.
    #[must_use]
    pub fn find_best(&self, pattern: &str, kind: FindKind) -> Option<&PackageRecord> {
        let mut best: Option<&PackageRecord> = None;
        for repo in &self.repos {
            if let Some(candidate) = repo.find(pattern, kind) {
                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        if compare_pkgver(&to_pkgver(candidate), &to_pkgver(current)) == std::cmp::Ordering::Greater {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }
        best
    }

    /// Exact pkgver match, first repository to have it wins.
    #[must_use]
    pub fn find_exact(&self, pkgver: &str) -> Option<&PackageRecord> {
        self.repos.iter().find_map(|r| r.find_exact(pkgver))
    }

    /// Config-file virtual-package alias lookup: tried before the
    /// provides index, per the original dispatch priority.
    #[must_use]
    pub fn find_virtualpkg_conf(&self, name: &str) -> Option<&PackageRecord> {
        let real_pkgver = self.virtualpkg_aliases.get(name)?;
        self.find_exact(real_pkgver)
    }

    /// Provides-index lookup across the pool, first match wins.
    #[must_use]
    pub fn find_virtualpkg(&self, pattern: &str, kind: FindKind) -> Option<&PackageRecord> {
        self.repos.iter().find_map(|r| r.find_virtual(pattern, kind))
    }

    /// The full candidate-selection dispatch used by `install(pattern)`:
    /// exact pkgver, else best-match by pattern/name, else config-alias
    /// virtual, else provides-index virtual.
    #[must_use]
    pub fn find_install_candidate(&self, pattern: &str) -> Option<&PackageRecord> {
        let kind = if pattern.contains('*') || pattern.contains('?') || is_relational(pattern) {
            FindKind::ByPattern
        } else {
            FindKind::ByName
        };
        if kind == FindKind::ByName {
            if let Some(hit) = self.find_exact_or_name(pattern) {
                return Some(hit);
            }
        }
        self.find_best(pattern, kind)
            .or_else(|| self.find_virtualpkg_conf(pattern))
            .or_else(|| self.find_virtualpkg(pattern, kind))
    }

    fn find_exact_or_name(&self, pattern: &str) -> Option<&PackageRecord> {
        self.find_exact(pattern)
    }
}

fn is_relational(pattern: &str) -> bool {
    [">=", "<=", "==", ">", "<"].iter().any(|op| pattern.contains(op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use xbps_core::PackageKey;

    fn record(name: &str, version: &str, provides: &[&str]) -> PackageRecord {
        PackageRecord {
            key: PackageKey {
                name: name.to_string(),
                version: version.to_string(),
                revision: 1,
            },
            dependencies: vec![],
            provides: provides.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>(),
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
    fn s1_simple_install_finds_best_match() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new(
            "repo1",
            vec![record("foo", "2.0", &[]), record("afoo", "1.1", &[])],
        ));
        let hit = pool.find_install_candidate("foo").unwrap();
        assert_eq!(hit.pkgver(), "foo-2.0_1");
    }

    #[test]
    fn s2_virtualpkg_by_name_resolves_to_provider() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new(
            "repo1",
            vec![record("afoo", "1.1", &["virtualpkg-9999_1"])],
        ));
        let hit = pool.find_install_candidate("virtualpkg").unwrap();
        assert_eq!(hit.pkgver(), "afoo-1.1_1");
    }

    #[test]
    fn s3_virtualpkg_by_pattern_resolves_to_provider() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new(
            "repo1",
            vec![record("afoo", "1.1", &["virtualpkg-9999_1"])],
        ));
        let hit = pool.find_install_candidate("virtualpkg>=9999").unwrap();
        assert_eq!(hit.pkgver(), "afoo-1.1_1");
    }

    #[test]
    fn find_best_visits_every_repository() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new("repo1", vec![record("foo", "1.0", &[])]));
        pool.add_repository(Repository::new("repo2", vec![record("foo", "2.0", &[])]));
        let hit = pool.find_best("foo", FindKind::ByName).unwrap();
        assert_eq!(hit.pkgver(), "foo-2.0_1");
    }

    #[test]
    fn virtualpkg_conf_alias_takes_priority() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(Repository::new(
            "repo1",
            vec![record("real-provider", "3.0", &[]), record("wrong-provider", "1.1", &["vname-1.0_1"])],
        ));
        let mut aliases = BTreeMap::new();
        aliases.insert("vname".to_string(), "real-provider-3.0_1".to_string());
        pool.set_virtualpkg_aliases(aliases);
        let hit = pool.find_virtualpkg_conf("vname").unwrap();
        assert_eq!(hit.pkgver(), "real-provider-3.0_1");
    }

    #[test]
    fn no_repositories_yields_no_candidates() {
        let pool = RepositoryPool::new();
        assert!(pool.find_install_candidate("foo").is_none());
    }
}
