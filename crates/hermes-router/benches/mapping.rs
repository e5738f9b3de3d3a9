//! Mapping benchmarks.
//!
//! Run with: `cargo bench -p hermes-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hermes_router::RequestMapper;

fn build_mapper(num_routes: usize) -> RequestMapper<usize> {
    let mut mapper = RequestMapper::new();

    for i in 0..num_routes / 3 {
        mapper
            .insert(&format!("/api/v1/resource{i}"), i)
            .expect("valid template");
    }
    for i in 0..num_routes / 3 {
        mapper
            .insert(&format!("/api/v1/resource{i}/{{id}}"), i)
            .expect("valid template");
    }
    for i in 0..num_routes / 3 {
        mapper
            .insert_prefix(&format!("/api/v1/org/{{orgId}}/resource{i}"), i)
            .expect("valid template");
    }

    mapper
}

fn bench_static_match(c: &mut Criterion) {
    let mapper = build_mapper(100);
    c.bench_function("static_match", |b| {
        b.iter(|| black_box(mapper.map("/api/v1/resource25")));
    });
}

fn bench_param_match(c: &mut Criterion) {
    let mapper = build_mapper(100);
    c.bench_function("param_match", |b| {
        b.iter(|| black_box(mapper.map("/api/v1/resource25/12345")));
    });
}

fn bench_prefix_match(c: &mut Criterion) {
    let mapper = build_mapper(100);
    c.bench_function("prefix_match", |b| {
        b.iter(|| black_box(mapper.map("/api/v1/org/acme/resource25/history/7")));
    });
}

fn bench_no_match(c: &mut Criterion) {
    let mapper = build_mapper(100);
    c.bench_function("no_match", |b| {
        b.iter(|| black_box(mapper.map("/nonexistent/path/here")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    for size in [10, 100, 1000] {
        let mapper = build_mapper(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &mapper, |b, m| {
            b.iter(|| black_box(m.map("/api/v1/resource1/42")));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_prefix_match,
    bench_no_match,
    bench_scaling
);
criterion_main!(benches);
