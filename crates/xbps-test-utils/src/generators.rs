//! Random pkgver/`DepAtom` generation for tests that don't need the
//! full shrinking machinery of [`crate::proptest_strategies`].

use rand::prelude::*;
use xbps_core::version::DepAtom;

const NAME_POOL: &[&str] = &["libfoo", "bar-utils", "baz", "quux-dev", "corelib", "tool", "widget", "zlib"];
const OPS: &[&str] = &[">=", "<=", ">", "<", "=="];

/// A random package name from a small fixed pool, so generated
/// dependency graphs collide with each other often enough to be
/// interesting.
#[must_use]
pub fn random_name() -> String {
    NAME_POOL.choose(&mut rand::thread_rng()).expect("pool is non-empty").to_string()
}

/// A random `major.minor.patch` version string.
#[must_use]
pub fn random_version() -> String {
    let mut rng = rand::thread_rng();
    format!("{}.{}.{}", rng.gen_range(0..5), rng.gen_range(0..10), rng.gen_range(0..20))
}

/// A random `name-version_revision` pkgver string.
#[must_use]
pub fn random_pkgver() -> String {
    format!("{}-{}_{}", random_name(), random_version(), rand::thread_rng().gen_range(1..5))
}

/// A random, always-parseable `Pkgver` string (see
/// [`xbps_core::version::Pkgver::parse`]).
#[must_use]
pub fn arbitrary_pkgver() -> String {
    random_pkgver()
}

/// A random `DepAtom`, drawn across all three of its shapes (bare name,
/// glob, relational).
#[must_use]
pub fn arbitrary_depatom() -> DepAtom {
    let mut rng = rand::thread_rng();
    let name = random_name();
    let pattern = match rng.gen_range(0..3) {
        0 => name,
        1 => format!("{name}*"),
        _ => format!("{name}{}{}", OPS.choose(&mut rng).unwrap(), random_version()),
    };
    DepAtom::parse(&pattern).expect("generated pattern is always well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_pkgver_parses() {
        for _ in 0..50 {
            let pkgver = random_pkgver();
            assert!(xbps_core::version::Pkgver::parse(&pkgver).is_ok(), "{pkgver} should parse");
        }
    }

    #[test]
    fn arbitrary_depatom_always_succeeds() {
        for _ in 0..50 {
            let _ = arbitrary_depatom();
        }
    }
}
