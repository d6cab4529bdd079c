use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use reed_lang::{Errors, Scanner, SourceMap, Token};

fn scan(source: &[u8]) {
    let mut map = SourceMap::new();
    let mut errors = Errors::new();

    map.open_file("bench.reed");

    let buffered = errors.save();

    {
        let mut scanner = Scanner::new(source, &mut map, &mut errors);

        while scanner.scan() != Token::Eof {}
    }

    errors.clear(buffered);
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let line = "result := alpha_value + 16#FF * count, \"text literal\", 3.25e-4\n";

    let mixed_10k = line.repeat(10_000).into_bytes();
    group.throughput(Throughput::Bytes(mixed_10k.len() as u64));
    group.bench_function("mixed: line x10k", |b| {
        b.iter(|| scan(black_box(&mixed_10k)))
    });

    let indented = "outer\n    inner := 1\n        deepest\n    back\n".repeat(10_000);
    let indented = indented.into_bytes();
    group.throughput(Throughput::Bytes(indented.len() as u64));
    group.bench_function("indentation: block x10k", |b| {
        b.iter(|| scan(black_box(&indented)))
    });

    let blobs = "$16#DEAD_BEEF_0123_4567_89AB_CDEF$\n".repeat(10_000).into_bytes();
    group.throughput(Throughput::Bytes(blobs.len() as u64));
    group.bench_function("blobs: literal x10k", |b| {
        b.iter(|| scan(black_box(&blobs)))
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
