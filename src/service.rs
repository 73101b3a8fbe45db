use crate::cache::{FreshnessCache, SqliteCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, DailyMaxSource, ServerAddress};
use crate::core::snapshot::{start_of_day_before, utc_date};
use crate::core::{DailyMax, HourlyAverage, ServedSnapshot, Snapshot, Source};
use crate::history::{HistoryStore, SqliteHistory};
use crate::providers::StatsFetcher;
use crate::storage::{Database, TableStats};
use std::sync::Arc;

/// Stats orchestrator
///
/// Answers "current stats" through the fallback chain
/// fresh cache → live fetch → stale cache → last history row → placeholder,
/// and serves the aggregate history queries. Storage and fetch failures are
/// logged and treated as "not found"; none of the query methods fail.
pub struct StatsService {
    cache: Arc<dyn FreshnessCache>,
    history: Arc<dyn HistoryStore>,
    fetcher: Arc<dyn StatsFetcher>,
    clock: Arc<dyn Clock>,
    options: ServiceOptions,
}

/// Service options/configuration
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub address: ServerAddress,
    /// Seconds a cache entry counts as fresh
    pub freshness_window: i64,
    pub default_server_name: String,
    pub default_map: String,
    pub daily_max_source: DailyMaxSource,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            address: config.server.clone(),
            freshness_window: config.freshness_window_secs,
            default_server_name: config.default_server_name.clone(),
            default_map: config.default_map.clone(),
            daily_max_source: config.daily_max_source,
        }
    }
}

/// Deletion counts from one `cleanup` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub history_deleted: u64,
    pub cache_deleted: u64,
}

/// Outcome of one scheduled fetch-and-persist cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub served: ServedSnapshot,
    pub elapsed_ms: f64,
}

impl CycleReport {
    /// One-line status for the scheduler log
    pub fn status_line(&self) -> String {
        let s = &self.served.snapshot;
        let prefix = if self.served.is_degraded() { "⚠️" } else { "✅" };
        format!(
            "{} {}/{} players on {} ({}) via {} in {:.0}ms",
            prefix,
            s.players,
            s.max_players,
            s.map,
            s.server_name,
            self.served.source,
            self.elapsed_ms
        )
    }
}

impl StatsService {
    pub fn new(
        cache: Arc<dyn FreshnessCache>,
        history: Arc<dyn HistoryStore>,
        fetcher: Arc<dyn StatsFetcher>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            cache,
            history,
            fetcher,
            clock: Arc::new(SystemClock),
            options,
        }
    }

    /// Service over the SQLite stores sharing `db`
    pub fn with_database(db: Database, fetcher: Arc<dyn StatsFetcher>, options: ServiceOptions) -> Self {
        Self::new(
            Arc::new(SqliteCache::new(db.clone())),
            Arc::new(SqliteHistory::new(db)),
            fetcher,
            options,
        )
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current server stats through the fallback chain; never fails
    pub async fn get_server_info(&self) -> ServedSnapshot {
        let now = self.clock.now();
        let window = self.options.freshness_window;

        match self.cache.get_fresh(now, window).await {
            Ok(Some(entry)) => {
                tracing::debug!("Cache hit (stored {}s ago)", now - entry.stored_at);
                return ServedSnapshot::new(entry.snapshot, Source::FreshCache);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Fresh cache lookup failed: {}", e),
        }

        match self.fetcher.fetch(&self.options.address).await {
            Ok(snapshot) => {
                self.record_live(&snapshot, now).await;
                return ServedSnapshot::new(snapshot, Source::Live);
            }
            Err(e) => tracing::warn!("Provider {} failed: {}", self.fetcher.name(), e),
        }

        match self.cache.get_latest().await {
            Ok(Some(entry)) => {
                tracing::info!("Serving stale cache entry from {}", entry.stored_at);
                return ServedSnapshot::new(entry.snapshot, Source::StaleCache);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Latest cache lookup failed: {}", e),
        }

        match self.history.latest().await {
            Ok(Some(record)) => {
                tracing::info!("Serving last persisted reading from {}", record.timestamp);
                return ServedSnapshot::new(record.into(), Source::History);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("History lookup failed: {}", e),
        }

        tracing::info!("No stats available anywhere, serving placeholder");
        ServedSnapshot::new(
            Snapshot::placeholder(
                self.options.default_server_name.clone(),
                self.options.default_map.clone(),
                now,
            ),
            Source::Default,
        )
    }

    /// Cache and persist a live reading; the two writes are independent
    async fn record_live(&self, snapshot: &Snapshot, now: i64) {
        if let Err(e) = self
            .cache
            .put(snapshot, now, self.options.freshness_window)
            .await
        {
            tracing::warn!("Failed to save to cache: {}", e);
        }

        self.save_stats(snapshot).await;
    }

    /// Append `snapshot` to the history log, reporting success
    pub async fn save_stats(&self, snapshot: &Snapshot) -> bool {
        match self.history.append(snapshot).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist snapshot: {}", e);
                false
            }
        }
    }

    /// One scheduled fetch-and-persist cycle
    pub async fn run_cycle(&self) -> CycleReport {
        let start = std::time::Instant::now();
        let served = self.get_server_info().await;

        CycleReport {
            served,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Hourly average player counts over the trailing `hours`; empty on failure
    pub async fn hourly_history(&self, hours: u32) -> Vec<HourlyAverage> {
        match self.history.hourly_average(self.clock.now(), hours).await {
            Ok(buckets) => buckets,
            Err(e) => {
                tracing::warn!("Hourly history query failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Daily maximum player counts over the trailing `days`
    ///
    /// Never empty: with no data (or a failed query) the result is a single
    /// entry for today with zero players.
    pub async fn daily_max(&self, days: u32) -> Vec<DailyMax> {
        let now = self.clock.now();

        let result = match self.options.daily_max_source {
            DailyMaxSource::History => self.history.daily_max(now, days).await,
            DailyMaxSource::Cache => {
                self.cache
                    .daily_max(start_of_day_before(now, days))
                    .await
            }
        };

        match result {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => vec![DailyMax { date: utc_date(now), players: 0 }],
            Err(e) => {
                tracing::warn!("Daily max query failed: {}", e);
                vec![DailyMax { date: utc_date(now), players: 0 }]
            }
        }
    }

    /// Drop history older than `retention_days` and cache entries older than
    /// ten freshness windows; false if either delete failed
    pub async fn cleanup(&self, retention_days: u32) -> bool {
        self.cleanup_report(retention_days).await.is_some()
    }

    /// Like [`cleanup`](Self::cleanup) but with deletion counts
    pub async fn cleanup_report(&self, retention_days: u32) -> Option<CleanupReport> {
        let now = self.clock.now();
        let history_cutoff = now - i64::from(retention_days) * 86_400;
        let cache_cutoff = now.saturating_sub(
            self.options.freshness_window.saturating_mul(10),
        );

        let history_deleted = self.history.prune(history_cutoff).await;
        let cache_deleted = self.cache.evict_older_than(cache_cutoff).await;

        match (history_deleted, cache_deleted) {
            (Ok(history_deleted), Ok(cache_deleted)) => {
                tracing::info!(
                    "Cleanup removed {} history rows and {} cache entries",
                    history_deleted,
                    cache_deleted
                );
                Some(CleanupReport { history_deleted, cache_deleted })
            }
            (history, cache) => {
                if let Err(e) = history {
                    tracing::warn!("History cleanup failed: {}", e);
                }
                if let Err(e) = cache {
                    tracing::warn!("Cache cleanup failed: {}", e);
                }
                None
            }
        }
    }

    /// Row counts of both tables
    pub async fn table_stats(&self) -> crate::error::Result<(TableStats, TableStats)> {
        let cache = self.cache.stats().await?;
        let history = self.history.stats().await?;
        Ok((cache, history))
    }
}
