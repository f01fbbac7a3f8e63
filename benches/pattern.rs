//! Pattern parse and render benchmarks.
//!
//! Run with: cargo bench

use std::hint::black_box;

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sequencing_worker::domain::GenerationContext;
use sequencing_worker::pattern::{PatternTemplate, RenderInput, VariableRegistry};

const PATTERNS: [(&str, &str); 3] = [
    ("counter", "{COUNTER}"),
    ("invoice", "INV-{YEAR}-{MONTH}-{COUNTER:6}"),
    (
        "conditional",
        "{TENANT}-{?type=credit?CN:INV}-{YEAR:2}{QUARTER}-{{{COUNTER:8}}}",
    ),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, pattern) in PATTERNS {
        group.bench_with_input(BenchmarkId::from_parameter(name), pattern, |b, pattern| {
            b.iter(|| black_box(PatternTemplate::parse(black_box(pattern))));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let registry = VariableRegistry::default();
    let context = GenerationContext::new()
        .with("tenant_code", "ACME")
        .with("type", "credit");
    let timestamp = Utc.with_ymd_and_hms(2025, 11, 3, 8, 30, 0).unwrap();

    let mut group = c.benchmark_group("render");

    for (name, pattern) in PATTERNS {
        let template = PatternTemplate::parse(pattern).unwrap();
        let mut counter = 0u64;
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                counter += 1;
                let input = RenderInput {
                    counter,
                    timestamp,
                    context: &context,
                    padding: 6,
                };
                black_box(registry.render(&template, &input))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
