//! Benchmarks for rustexporter reporting paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rustexporter::collectors::Collectors;
use rustexporter::exporter::compose_url;
use rustexporter::metrics::MetricsRegistry;
use rustexporter::reporter::{FieldMapping, FieldReporter, FlattenReporter, MetricReporter};
use serde_json::{json, Value};

fn sample_document(nodes: usize) -> Value {
    let nodes: Vec<Value> = (0..nodes)
        .map(|i| {
            json!({
                "id": i,
                "cpu": { "load": 0.5 + i as f64, "cores": 8 },
                "memory": { "used": 1024 * i, "free": 4096 },
                "healthy": i % 2 == 0,
            })
        })
        .collect();
    json!({ "cluster": { "name": "main", "nodes": nodes, "uptime": 12345 } })
}

fn benchmark_flatten(c: &mut Criterion) {
    let document = sample_document(16);
    let reporter = FlattenReporter::new();
    let collectors = Collectors::new(Some("bench".to_string()), MetricsRegistry::new());

    let mut group = c.benchmark_group("flatten");
    group.throughput(Throughput::Elements(1));

    group.bench_function("report", |b| {
        b.iter(|| reporter.report(black_box(&document), &collectors))
    });

    group.bench_function("deserialize_and_report", |b| {
        let content = document.to_string();
        b.iter(|| {
            let value: Value = serde_json::from_str(black_box(&content)).unwrap();
            reporter.report(&value, &collectors)
        })
    });

    group.finish();
}

fn benchmark_fields(c: &mut Criterion) {
    let document = sample_document(16);
    let mappings = (0..16)
        .map(|i| FieldMapping {
            pointer: format!("/cluster/nodes/{}/cpu/load", i),
            name: format!("node_{}_cpu_load", i),
            kind: Default::default(),
            help: "CPU load".to_string(),
            labels: Default::default(),
        })
        .collect();
    let reporter = FieldReporter::new(mappings);
    let collectors = Collectors::new(None, MetricsRegistry::new());

    c.bench_function("fields_report", |b| {
        b.iter(|| reporter.report(black_box(&document), &collectors))
    });
}

fn benchmark_batch(c: &mut Criterion) {
    let collectors = Collectors::new(None, MetricsRegistry::new());

    let mut group = c.benchmark_group("batch");

    group.bench_function("commit_gauges", |b| {
        b.iter(|| {
            let mut batch = collectors.batch();
            for i in 0..8 {
                batch.set_gauge_with(
                    "node_load",
                    "Node load",
                    vec![("node".to_string(), i.to_string())],
                    black_box(i as f64),
                );
            }
            batch.commit()
        })
    });

    group.bench_function("commit_counter", |b| {
        b.iter(|| {
            let mut batch = collectors.batch();
            batch.inc_counter("requests", "Requests", black_box(1.0));
            batch.commit()
        })
    });

    group.finish();
}

fn benchmark_compose_url(c: &mut Criterion) {
    c.bench_function("compose_url", |b| {
        b.iter(|| compose_url(black_box("http://host/api"), black_box(Some("/status"))))
    });
}

criterion_group!(
    benches,
    benchmark_flatten,
    benchmark_fields,
    benchmark_batch,
    benchmark_compose_url,
);
criterion_main!(benches);
