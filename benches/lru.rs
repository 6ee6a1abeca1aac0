use std::hint::black_box;
use std::sync::Arc;

use cachegate::policy::lru::{ConcurrentLruCache, LruCore};
use cachegate::traits::CacheStore;
use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};

fn bench_lru_core_insert_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_core");
    group.throughput(Throughput::Elements(1024 * 2));
    group.bench_function("insert_take_evicting", |b| {
        b.iter_batched(
            || {
                let mut cache = LruCore::new(1024);
                for i in 0..1024u64 {
                    cache.insert(i, Arc::new(i));
                }
                cache
            },
            |mut cache| {
                for i in 0..1024u64 {
                    cache.insert(black_box(i + 10_000), Arc::new(i));
                    let _ = black_box(cache.take(&black_box(i)));
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("take_hotset", |b| {
        b.iter_batched(
            || {
                let mut cache = LruCore::new(4096);
                for i in 0..4096u64 {
                    cache.insert(i, Arc::new(i));
                }
                cache
            },
            |mut cache| {
                for i in 0..4096u64 {
                    let _ = black_box(cache.take(&black_box(i)));
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_lru_concurrent_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_store");
    group.throughput(Throughput::Elements(1024));
    group.bench_function("put_take", |b| {
        let cache: ConcurrentLruCache<u64, u64> = ConcurrentLruCache::new(512);
        b.iter(|| {
            for i in 0..1024u64 {
                cache.put(black_box(i % 768), Arc::new(i));
                let _ = black_box(cache.take(&black_box(i % 512)));
            }
        })
    });
    group.bench_function("contains_read_lock", |b| {
        let cache: ConcurrentLruCache<u64, u64> = ConcurrentLruCache::new(1024);
        for i in 0..1024u64 {
            cache.put(i, Arc::new(i));
        }
        b.iter(|| {
            for i in 0..1024u64 {
                black_box(cache.contains(&black_box(i)));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_lru_core_insert_take, bench_lru_concurrent_store);
criterion_main!(benches);
