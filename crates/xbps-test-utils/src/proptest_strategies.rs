//! Proptest strategies for version-algebra and package-record types.

use proptest::prelude::*;
use xbps_core::package::{PackageKey, PackageRecord};
use xbps_core::version::{DepAtom, Pkgver};

/// A package name drawn from a small alphabet, deliberately narrow so
/// generated dependency graphs collide with each other.
pub fn package_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,12}".prop_filter("must not end in a bare hyphen", |s| !s.ends_with('-'))
}

/// A `major.minor.patch` version string.
pub fn version_strategy() -> impl Strategy<Value = String> {
    (0u32..50, 0u32..50, 0u32..50).prop_map(|(a, b, c)| format!("{a}.{b}.{c}"))
}

/// A `name-version_revision` pkgver string, already known to parse via
/// [`Pkgver::parse`].
pub fn pkgver_strategy() -> impl Strategy<Value = String> {
    (package_name_strategy(), version_strategy(), 1u32..10)
        .prop_map(|(name, version, revision)| format!("{name}-{version}_{revision}"))
}

/// A [`PackageKey`] built from [`pkgver_strategy`]'s components directly,
/// so tests can assert on the parts without re-parsing the rendered form.
pub fn package_key_strategy() -> impl Strategy<Value = PackageKey> {
    (package_name_strategy(), version_strategy(), 1u32..10)
        .prop_map(|(name, version, revision)| PackageKey { name, version, revision })
}

/// A minimal [`PackageRecord`] with no dependencies or conflicts, for
/// strategies that only need a valid identity.
pub fn bare_record_strategy() -> impl Strategy<Value = PackageRecord> {
    package_key_strategy().prop_map(|key| PackageRecord {
        key,
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
    })
}

/// A `DepAtom::Name` or `DepAtom::Relational` pattern string (never
/// `Glob`, since most resolver tests want a concrete dependency).
pub fn dep_pattern_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        package_name_strategy(),
        (package_name_strategy(), prop_oneof![Just(">="), Just("<="), Just("=="), Just(">"), Just("<")], version_strategy())
            .prop_map(|(name, op, version)| format!("{name}{op}{version}")),
    ]
}

/// A parsed [`DepAtom`] from [`dep_pattern_strategy`].
pub fn dep_atom_strategy() -> impl Strategy<Value = DepAtom> {
    dep_pattern_strategy().prop_map(|pattern| DepAtom::parse(&pattern).expect("strategy only emits well-formed patterns"))
}

proptest! {
    #[test]
    fn pkgvers_from_the_strategy_always_parse(pkgver in pkgver_strategy()) {
        prop_assert!(Pkgver::parse(&pkgver).is_ok());
    }

    #[test]
    fn pkgvers_round_trip_their_key(key in package_key_strategy()) {
        let rendered = key.pkgver();
        let parsed = Pkgver::parse(&rendered).unwrap();
        prop_assert_eq!(parsed.name(), key.name.as_str());
    }

    #[test]
    fn dep_atoms_from_the_strategy_always_parse(pattern in dep_pattern_strategy()) {
        prop_assert!(DepAtom::parse(&pattern).is_some());
    }
}
