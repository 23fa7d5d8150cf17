//! Round-trip throughput of the property-list codec against a
//! repository-index-shaped document, scaled by package count.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use xbps_core::Plist;

fn package_entry(i: usize) -> Plist {
    let mut dict = BTreeMap::new();
    dict.insert("pkgver".to_string(), Plist::String(format!("pkg{i}-1.{i}_1")));
    dict.insert("installed_size".to_string(), Plist::Integer(1024 * (i as i64 + 1)));
    dict.insert(
        "run_depends".to_string(),
        Plist::Array(if i == 0 { Vec::new() } else { vec![Plist::String(format!("pkg{}>=1.0", i - 1))] }),
    );
    Plist::Dict(dict)
}

fn index_document(count: usize) -> Plist {
    let mut root = BTreeMap::new();
    root.insert("packages".to_string(), Plist::Array((0..count).map(package_entry).collect()));
    Plist::Dict(root)
}

fn bench_to_xml(c: &mut Criterion) {
    let mut group = c.benchmark_group("plist_to_xml");
    for size in [10usize, 100, 1000] {
        let doc = index_document(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(doc.to_xml()));
        });
    }
    group.finish();
}

fn bench_from_xml(c: &mut Criterion) {
    let mut group = c.benchmark_group("plist_from_xml");
    for size in [10usize, 100, 1000] {
        let xml = index_document(size).to_xml();
        group.bench_with_input(BenchmarkId::from_parameter(size), &xml, |b, xml| {
            b.iter(|| black_box(Plist::from_xml(black_box(xml)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_to_xml, bench_from_xml);
criterion_main!(benches);
