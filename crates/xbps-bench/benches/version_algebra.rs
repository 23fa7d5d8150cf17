//! Throughput of pkgver parsing, comparison, and dependency-atom
//! matching — the hottest path during repository-index loading and
//! resolver candidate selection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use xbps_core::version::{compare_pkgver, match_pattern, Pkgver};

fn bench_pkgver_parse(c: &mut Criterion) {
    let samples = ["firefox-128.0.3_1", "glibc-2.39_2", "xorg-server-21.1.11_3", "zlib-1.3"];
    c.bench_function("pkgver_parse", |b| {
        b.iter(|| {
            for s in &samples {
                black_box(Pkgver::parse(black_box(s)).unwrap());
            }
        });
    });
}

fn bench_compare_pkgver(c: &mut Criterion) {
    let a = Pkgver::parse("firefox-128.0.3_1").unwrap();
    let b = Pkgver::parse("firefox-128.0.2_5").unwrap();
    c.bench_function("compare_pkgver", |bencher| {
        bencher.iter(|| black_box(compare_pkgver(black_box(&a), black_box(&b))));
    });
}

fn bench_dep_atom_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("dep_atom_match");
    for pattern in ["glibc", "glibc>=2.30", "glibc<3.0"] {
        group.bench_with_input(BenchmarkId::from_parameter(pattern), pattern, |b, pattern| {
            b.iter(|| black_box(match_pattern(black_box("glibc-2.39_2"), black_box(pattern))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pkgver_parse, bench_compare_pkgver, bench_dep_atom_match);
criterion_main!(benches);
