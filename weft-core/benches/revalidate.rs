//! Benchmarks for graph revalidation.
//!
//! Measures the two paths a UI host hits constantly: re-reading a clean
//! memo chain (should be a handful of atomic loads) and pulling the chain
//! back up to date after a root write.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use weft_core::reactive::{Memo, Signal};

const CHAIN_DEPTH: usize = 64;

fn build_chain(source: &Signal<u64>) -> Memo<u64> {
    let mut last = {
        let source = source.clone();
        Memo::new(move || source.get() + 1)
    };
    for _ in 1..CHAIN_DEPTH {
        let prev = last.clone();
        last = Memo::new(move || prev.get() + 1);
    }
    last
}

fn bench_revalidation(c: &mut Criterion) {
    let source = Signal::new(0u64);
    let tail = build_chain(&source);

    c.bench_function("clean_read", |b| {
        let _ = tail.get();
        b.iter(|| black_box(tail.get()));
    });

    c.bench_function("revalidate_after_write", |b| {
        let mut next = 1u64;
        b.iter(|| {
            source.set(next);
            next += 1;
            black_box(tail.get())
        });
    });
}

criterion_group!(benches, bench_revalidation);
criterion_main!(benches);
