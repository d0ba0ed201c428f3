// Resolution cache performance benchmarks.
// Tests insert/getent throughput and bucket collision behavior at a range
// of cache sizes and key-space shapes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gwp_resolver::Cache;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

fn addr(i: u32) -> [IpAddr; 1] {
    [IpAddr::V4(Ipv4Addr::from(i))]
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_insert");

    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let cache = Cache::new(1024).unwrap();
                let expiry = Instant::now() + Duration::from_secs(300);
                for i in 0..size {
                    cache
                        .insert(&format!("host{i}.bench"), addr(i as u32), expiry)
                        .unwrap();
                }
                black_box(cache);
            });
        });
    }

    group.finish();
}

fn bench_getent_hit(c: &mut Criterion) {
    let cache = Cache::new(1024).unwrap();
    let expiry = Instant::now() + Duration::from_secs(300);
    for i in 0..10_000u32 {
        cache.insert(&format!("host{i}.bench"), addr(i), expiry).unwrap();
    }

    c.bench_function("cache_getent_hit", |b| {
        b.iter(|| {
            for i in (0..10_000u32).step_by(37) {
                black_box(cache.getent(&format!("host{i}.bench")).unwrap());
            }
        });
    });
}

fn bench_getent_miss(c: &mut Criterion) {
    let cache = Cache::new(1024).unwrap();
    let expiry = Instant::now() + Duration::from_secs(300);
    for i in 0..10_000u32 {
        cache.insert(&format!("host{i}.bench"), addr(i), expiry).unwrap();
    }

    c.bench_function("cache_getent_miss", |b| {
        b.iter(|| {
            for i in 0..1_000u32 {
                black_box(cache.getent(&format!("absent{i}.bench")));
            }
        });
    });
}

fn bench_replacement(c: &mut Criterion) {
    let cache = Cache::new(256).unwrap();
    let expiry = Instant::now() + Duration::from_secs(300);
    cache.insert("hot.bench", addr(1), expiry).unwrap();

    c.bench_function("cache_replace_same_key", |b| {
        b.iter(|| {
            cache.insert("hot.bench", addr(black_box(2)), expiry).unwrap();
        });
    });
}

fn bench_bucket_collisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_collision_pressure");

    for bucket_count in [1usize, 4, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(bucket_count),
            &bucket_count,
            |b, &bucket_count| {
                b.iter(|| {
                    let cache = Cache::new(bucket_count).unwrap();
                    let expiry = Instant::now() + Duration::from_secs(300);
                    for i in 0..2_000u32 {
                        cache.insert(&format!("collide{i}.bench"), addr(i), expiry).unwrap();
                    }
                    for i in 0..2_000u32 {
                        black_box(cache.getent(&format!("collide{i}.bench")).unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_housekeep(c: &mut Criterion) {
    c.bench_function("cache_housekeep_half_expired", |b| {
        b.iter(|| {
            let cache = Cache::new(1024).unwrap();
            let now = Instant::now();
            for i in 0..10_000u32 {
                let expiry = if i % 2 == 0 {
                    now - Duration::from_secs(1)
                } else {
                    now + Duration::from_secs(300)
                };
                cache.insert(&format!("hk{i}.bench"), addr(i), expiry).unwrap();
            }
            cache.housekeep();
            black_box(cache);
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_getent_hit,
    bench_getent_miss,
    bench_replacement,
    bench_bucket_collisions,
    bench_housekeep
);
criterion_main!(benches);
