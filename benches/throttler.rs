//! # Throttler Benchmarks
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use throttler::{CancellationToken, Throttler, ThrottlerConfig, ThrottlerRegistry};

/// Granted path: plenty of tokens left
fn bench_execute_granted(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute_granted");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_thread", |b| {
        let throttler = Throttler::new(u64::MAX).unwrap();
        b.iter(|| throttler.execute(|| std::hint::black_box(())));
    });

    group.finish();
}

/// Drop path: bucket exhausted for the rest of a long window
fn bench_execute_dropped(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute_dropped");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_thread", |b| {
        let throttler = Throttler::new(1).unwrap();
        throttler.execute(|| {});
        b.iter(|| std::hint::black_box(throttler.try_execute(|| {})));
    });

    group.bench_function("cancellable", |b| {
        let throttler = Throttler::new(1).unwrap();
        let cancel = CancellationToken::new();
        throttler.execute(|| {});
        b.iter(|| std::hint::black_box(throttler.execute_cancellable(|| {}, &cancel)));
    });

    group.finish();
}

/// Contended lock with many callers sharing one throttler
fn bench_concurrent_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_execute");

    for num_threads in [2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let throttler = Arc::new(Throttler::new(num_threads as u64 * 500).unwrap());

                b.iter_custom(|iters| {
                    let mut total_duration = Duration::ZERO;

                    for _ in 0..iters {
                        throttler.reset();
                        let start = Instant::now();

                        let handles: Vec<_> = (0..num_threads)
                            .map(|_| {
                                let throttler = throttler.clone();
                                thread::spawn(move || {
                                    for _ in 0..1000 {
                                        throttler.execute(|| std::hint::black_box(()));
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.join().unwrap();
                        }

                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Registry lookup for existing and new keys
fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    group.bench_function("existing_key", |b| {
        let registry = ThrottlerRegistry::new(ThrottlerConfig::new(u64::MAX)).unwrap();
        registry.execute(7u32, || {});
        b.iter(|| std::hint::black_box(registry.execute(7u32, || {})));
    });

    group.bench_function("rotating_keys", |b| {
        let registry = ThrottlerRegistry::new(ThrottlerConfig::new(u64::MAX)).unwrap();
        let mut key = 0u32;
        b.iter(|| {
            key = (key + 1) % 1000;
            std::hint::black_box(registry.execute(key, || {}))
        });
    });

    group.finish();
}

/// Metrics snapshot
fn bench_metrics(c: &mut Criterion) {
    c.bench_function("metrics_snapshot", |b| {
        let throttler = Throttler::new(1000).unwrap();
        for _ in 0..500 {
            throttler.execute(|| {});
        }
        b.iter(|| std::hint::black_box(throttler.metrics()));
    });
}

criterion_group!(
    benches,
    bench_execute_granted,
    bench_execute_dropped,
    bench_concurrent_execute,
    bench_registry,
    bench_metrics,
);

criterion_main!(benches);
