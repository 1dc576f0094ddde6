use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use ave::Context;

static INPUT: &str = include_str!("../demos/big.ave");

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("parser", |b| {
        b.iter(|| {
            let mut ctx = Context::new();
            let scanned = ave::lex("big.ave", black_box(INPUT));
            let parsed = ave::parse(&mut ctx, scanned);
            black_box(parsed.program);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
