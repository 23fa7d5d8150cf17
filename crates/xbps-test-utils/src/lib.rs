//! Testing fixtures and generators shared across the transaction engine
//! crates.
//!
//! - [`fixtures`]: pre-built `PackageRecord`/`RepositoryPool`/`PackageDatabase`
//!   scenarios for resolver and executor tests.
//! - [`generators`]: random pkgver/`DepAtom` generation for ad hoc tests.
//! - [`proptest_strategies`]: `proptest::Strategy` impls for the same types.
//! - [`assertions`]: domain-specific assertion helpers.
//! - [`mock_transport`]: an in-memory `Transport` implementation.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod fixtures;
pub mod generators;
pub mod mock_transport;
pub mod proptest_strategies;

pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fixtures::{record, scratch_db, PoolBuilder};
    pub use crate::generators::{arbitrary_depatom, arbitrary_pkgver};
    pub use crate::mock_transport::InMemoryTransport;
    pub use pretty_assertions::{assert_eq, assert_ne};
    pub use proptest::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_builder_is_reachable_through_the_prelude() {
        let rec = prelude::record("foo", "1.0", 1);
        assert_eq!(rec.key.name, "foo");
    }
}
