use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use server_stats_engine::cache::{FreshnessCache, SqliteCache};
use server_stats_engine::clock::ManualClock;
use server_stats_engine::history::{HistoryStore, SqliteHistory};
use server_stats_engine::providers::ScriptedFetcher;
use server_stats_engine::{Database, ServiceOptions, Snapshot, StatsService};

const NOW: i64 = 1_700_000_000;
const WINDOW: i64 = 300;

async fn setup_db() -> Database {
    let db = Database::open(":memory:").unwrap();
    let cache = SqliteCache::new(db.clone());
    let history = SqliteHistory::new(db.clone());

    // One reading per minute over the last week
    for i in 0..(7 * 24 * 60) {
        let ts = NOW - i * 60;
        let snapshot = Snapshot::new((i % 64) as u32, 64, "Bench", "map_a", ts);
        history.append(&snapshot).await.unwrap();
        if i < 10 {
            cache.put(&snapshot, ts, WINDOW).await.unwrap();
        }
    }

    db
}

fn bench_cache_lookup(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let db = runtime.block_on(setup_db());
    let cache = SqliteCache::new(db);

    c.bench_function("cache_get_fresh_hit", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.get_fresh(NOW, WINDOW).await.unwrap())
        });
    });

    c.bench_function("cache_get_fresh_miss", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.get_fresh(NOW + 10 * WINDOW, WINDOW).await.unwrap())
        });
    });
}

fn bench_cache_put(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let cache = SqliteCache::new(Database::open(":memory:").unwrap());
    let snapshot = Snapshot::new(42, 100, "Bench", "map_a", NOW);

    c.bench_function("cache_put_with_eviction", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.put(&snapshot, NOW, WINDOW).await.unwrap())
        });
    });
}

fn bench_history_aggregates(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let db = runtime.block_on(setup_db());
    let history = SqliteHistory::new(db);

    c.bench_function("history_hourly_average_24h", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(history.hourly_average(NOW, 24).await.unwrap())
        });
    });

    c.bench_function("history_daily_max_7d", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(history.daily_max(NOW, 7).await.unwrap())
        });
    });
}

fn bench_service_fresh_path(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let db = runtime.block_on(setup_db());
    let service = StatsService::with_database(
        db,
        Arc::new(ScriptedFetcher::new()),
        ServiceOptions::default(),
    )
    .with_clock(Arc::new(ManualClock::new(NOW)));

    c.bench_function("service_get_server_info_fresh", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(service.get_server_info().await)
        });
    });
}

criterion_group!(
    benches,
    bench_cache_lookup,
    bench_cache_put,
    bench_history_aggregates,
    bench_service_fresh_path
);
criterion_main!(benches);
