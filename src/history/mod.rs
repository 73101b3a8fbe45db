pub mod sqlite;

use async_trait::async_trait;
use crate::core::{DailyMax, HourlyAverage, Snapshot};
use crate::error::Result;
use crate::storage::TableStats;

pub use sqlite::SqliteHistory;

/// Append-only log of every fetched snapshot
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one snapshot as a new row
    async fn append(&self, snapshot: &Snapshot) -> Result<()>;

    /// Most recent row by timestamp
    async fn latest(&self) -> Result<Option<HistoryRecord>>;

    /// Floor of the mean player count per hour over the trailing `since_hours`,
    /// ascending by hour
    async fn hourly_average(&self, now: i64, since_hours: u32) -> Result<Vec<HourlyAverage>>;

    /// Max player count per UTC date since midnight `since_days` days ago,
    /// ascending by date
    async fn daily_max(&self, now: i64, since_days: u32) -> Result<Vec<DailyMax>>;

    /// Delete rows with a timestamp before `cutoff`
    async fn prune(&self, cutoff: i64) -> Result<u64>;

    /// Row count and timestamp range
    async fn stats(&self) -> Result<TableStats>;
}

/// One persisted row of `server_stats`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: i64,
    pub players: u32,
    pub max_players: u32,
    pub server_name: String,
    pub map: String,
    pub timestamp: i64,
}

impl From<HistoryRecord> for Snapshot {
    fn from(record: HistoryRecord) -> Self {
        Snapshot {
            players: record.players,
            max_players: record.max_players,
            server_name: record.server_name,
            map: record.map,
            timestamp: record.timestamp,
        }
    }
}
