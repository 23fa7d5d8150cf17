//! Domain-specific assertion helpers for pkgdb and transaction-document
//! tests.

use xbps_core::package::PackageState;
use xbps_pkgdb::PackageDatabase;
use xbps_resolver::TransactionDocument;

/// Assert that `name` is registered in `db` with the given state.
///
/// # Panics
/// Panics with a descriptive message if the package is absent or in a
/// different state.
pub fn assert_installed_at(db: &PackageDatabase, name: &str, state: PackageState) {
    match db.get(name) {
        Some(pkg) => assert_eq!(pkg.state, state, "'{name}' is in state {:?}, expected {state:?}", pkg.state),
        None => panic!("'{name}' is not registered in the database"),
    }
}

/// Assert that `name` is absent from `db` entirely.
///
/// # Panics
/// Panics if the package is still registered.
pub fn assert_not_registered(db: &PackageDatabase, name: &str) {
    assert!(db.get(name).is_none(), "'{name}' is still registered in the database");
}

/// Assert that a resolved document is immediately executable: no
/// missing dependencies, no conflicts.
///
/// # Panics
/// Panics with the offending list if the document is not satisfiable.
pub fn assert_satisfiable(document: &TransactionDocument) {
    assert!(document.missing.is_empty(), "document has missing dependencies: {:?}", document.missing);
    assert!(document.conflicts.is_empty(), "document has conflicts: {:?}", document.conflicts);
}

/// Assert that a document's steps contain exactly one entry for `name`
/// with the given action.
///
/// # Panics
/// Panics if no step, or more than one step, matches.
pub fn assert_has_step(document: &TransactionDocument, name: &str, action: xbps_resolver::StepAction) {
    let matches: Vec<_> = document.steps.iter().filter(|s| s.record.key.name == name && s.action == action).collect();
    assert_eq!(matches.len(), 1, "expected exactly one {action:?} step for '{name}', found {}", matches.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{install_into, record, scratch_db};

    #[test]
    fn assert_installed_at_passes_for_a_matching_state() {
        let (_dir, mut db) = scratch_db();
        install_into(&mut db, record("foo", "1.0", 1), false, PackageState::Installed);
        assert_installed_at(&db, "foo", PackageState::Installed);
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn assert_installed_at_panics_when_absent() {
        let (_dir, db) = scratch_db();
        assert_installed_at(&db, "missing", PackageState::Installed);
    }
}
