//! Benchmark harness helpers shared across the `benches/` binaries.
//!
//! The benchmarks themselves live under `benches/` (one `criterion`
//! binary each); this crate only hosts the synthetic-graph generators
//! they share, so a graph shape used by one benchmark stays consistent
//! if another wants to reuse it.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use xbps_core::package::PackageRecord;
use xbps_test_utils::fixtures::RecordBuilder;

/// A chain of `count` packages, each depending on exactly the previous
/// one by name — the worst case for a topological sort, since every
/// node is strictly ordered relative to every other.
#[must_use]
pub fn linear_chain(count: usize) -> Vec<PackageRecord> {
    (0..count)
        .map(|i| {
            let name = format!("pkg-{i}");
            let mut builder = RecordBuilder::new(&name, "1.0", 1);
            if i > 0 {
                builder = builder.depends_on(&format!("pkg-{}", i - 1));
            }
            builder.build()
        })
        .collect()
}

/// A dependency forest: `width` independent roots, each with a chain of
/// `depth` packages hanging off it. Exercises the resolver's
/// breadth-first closure against a graph with real fan-out instead of
/// one long chain.
#[must_use]
pub fn forest(width: usize, depth: usize) -> Vec<PackageRecord> {
    let mut records = Vec::with_capacity(width * depth);
    for root in 0..width {
        for level in 0..depth {
            let name = format!("root{root}-lvl{level}");
            let mut builder = RecordBuilder::new(&name, "1.0", 1);
            if level > 0 {
                builder = builder.depends_on(&format!("root{root}-lvl{}", level - 1));
            }
            records.push(builder.build());
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_produces_the_requested_count() {
        assert_eq!(linear_chain(10).len(), 10);
    }

    #[test]
    fn forest_produces_width_times_depth_records() {
        assert_eq!(forest(4, 5).len(), 20);
    }
}
