use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

static INPUT: &str = include_str!("../demos/big.ave");

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("lexer", |b| {
        b.iter(|| {
            let outcome = ave::lexer::lex(black_box(INPUT));
            black_box(outcome.tokens);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
