pub mod sqlite;

use async_trait::async_trait;
use crate::core::{DailyMax, Snapshot};
use crate::error::Result;
use crate::storage::TableStats;

pub use sqlite::SqliteCache;

/// Time-keyed cache of fetched snapshots
///
/// Rows are appended, never overwritten; lookups pick the newest row.
#[async_trait]
pub trait FreshnessCache: Send + Sync {
    /// Newest entry stored strictly after `now - window`
    async fn get_fresh(&self, now: i64, window: i64) -> Result<Option<CacheEntry>>;

    /// Newest entry regardless of age
    async fn get_latest(&self) -> Result<Option<CacheEntry>>;

    /// Evict entries older than `2 * window`, then append `snapshot` stored at `now`
    async fn put(&self, snapshot: &Snapshot, now: i64, window: i64) -> Result<()>;

    /// Delete entries stored before `cutoff`, returning how many went
    async fn evict_older_than(&self, cutoff: i64) -> Result<u64>;

    /// Max cached player count per UTC date for entries stored at or after `since`
    async fn daily_max(&self, since: i64) -> Result<Vec<DailyMax>>;

    /// Row count and stored_at range
    async fn stats(&self) -> Result<TableStats>;
}

/// Cached snapshot with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: i64,
    pub snapshot: Snapshot,
    /// Unix seconds at which the row was written
    pub stored_at: i64,
}
