//! Wire codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tripsync_bench::generate_batch;
use tripsync_protocol::{decode_batch, encode_batch, PullResponse};

/// Benchmark encoding batches of increasing size.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_batch");

    for size in [10, 100, 1_000] {
        let batch = generate_batch(size, size, 0, 256);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                let bytes = encode_batch(black_box(batch)).unwrap();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

/// Benchmark decoding batches of increasing size.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batch");

    for size in [10, 100, 1_000] {
        let bytes = encode_batch(&generate_batch(size, size, 0, 256)).unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| {
                let batch = decode_batch(black_box(bytes)).unwrap();
                black_box(batch);
            });
        });
    }

    group.finish();
}

/// Benchmark a full pull response round trip.
fn bench_pull_response(c: &mut Criterion) {
    let response = PullResponse::new(generate_batch(500, 500, 0, 128), None);
    let bytes = response.encode().unwrap();

    c.bench_function("pull_response/encode", |b| {
        b.iter(|| black_box(black_box(&response).encode().unwrap()));
    });
    c.bench_function("pull_response/decode", |b| {
        b.iter(|| black_box(PullResponse::decode(black_box(&bytes)).unwrap()));
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_pull_response);
criterion_main!(benches);
