//! Performance benchmarks for a3s-dispatch
//!
//! Run with: cargo bench

use a3s_dispatch::{DispatchEngine, EngineConfig, SelectionStrategy};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tokio::runtime::Runtime;

const ITEMS: u64 = 1_000;

fn make_engine(strategy: SelectionStrategy) -> DispatchEngine<u64> {
    DispatchEngine::with_fn(
        EngineConfig::new(2, 4)
            .with_uniform_capacity(4096)
            .with_selection(strategy),
        |_item: u64| async { Ok(()) },
    )
    .expect("valid benchmark config")
}

/// Enqueue throughput per selection strategy, end to end (enqueue + drain)
fn bench_enqueue_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("enqueue_throughput");
    group.throughput(Throughput::Elements(ITEMS));

    for strategy in [
        SelectionStrategy::RoundRobin,
        SelectionStrategy::Affinity,
        SelectionStrategy::LeastLoaded,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", strategy)),
            &strategy,
            |b, &strategy| {
                b.iter(|| {
                    rt.block_on(async {
                        let engine = make_engine(strategy);
                        engine.start().await.unwrap();
                        for i in 0..ITEMS {
                            engine.enqueue(i, (i % 2) as usize, None).await;
                        }
                        engine.shutdown(Duration::from_secs(10)).await.unwrap();
                    })
                })
            },
        );
    }
    group.finish();
}

/// Non-suspending enqueue path against an idle engine
fn bench_try_enqueue(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("try_enqueue");
    group.throughput(Throughput::Elements(ITEMS));

    group.bench_function("round_robin", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine = make_engine(SelectionStrategy::RoundRobin);
                engine.start().await.unwrap();
                for i in 0..ITEMS {
                    engine.try_enqueue(i, (i % 2) as usize, None);
                }
                engine.shutdown(Duration::from_secs(10)).await.unwrap();
            })
        })
    });
    group.finish();
}

/// Affinity enqueue with a small keyspace, stressing per-key partitions
fn bench_affinity_keyed(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let keys: Vec<String> = (0..16).map(|k| format!("tenant-{k}")).collect();

    let mut group = c.benchmark_group("affinity_keyed");
    group.throughput(Throughput::Elements(ITEMS));
    group.bench_function("16_keys", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine = make_engine(SelectionStrategy::Affinity);
                engine.start().await.unwrap();
                for i in 0..ITEMS {
                    let key = &keys[(i % 16) as usize];
                    engine.enqueue(i, 1, Some(key)).await;
                }
                engine.shutdown(Duration::from_secs(10)).await.unwrap();
            })
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_enqueue_throughput,
    bench_try_enqueue,
    bench_affinity_keyed
);
criterion_main!(benches);
