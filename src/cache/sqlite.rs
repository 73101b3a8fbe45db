use rusqlite::{params, OptionalExtension, Row};
use async_trait::async_trait;

use crate::cache::{CacheEntry, FreshnessCache};
use crate::core::{DailyMax, Snapshot};
use crate::error::Result;
use crate::storage::{Database, TableStats};
use crate::history::sqlite::parse_date_column;

/// SQLite-backed freshness cache over the `server_stats_cache` table
///
/// Each row holds a JSON-serialized [`Snapshot`] plus the unix time it was
/// stored at.
#[derive(Clone)]
pub struct SqliteCache {
    db: Database,
}

impl SqliteCache {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
        let data: String = row.get(1)?;
        let snapshot = Snapshot::from_json(&data).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(CacheEntry {
            id: row.get(0)?,
            snapshot,
            stored_at: row.get(2)?,
        })
    }
}

#[async_trait]
impl FreshnessCache for SqliteCache {
    async fn get_fresh(&self, now: i64, window: i64) -> Result<Option<CacheEntry>> {
        let conn = self.db.conn()?;

        let entry = conn
            .query_row(
                "SELECT id, data, timestamp FROM server_stats_cache
                 WHERE timestamp > ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT 1",
                params![now.saturating_sub(window)],
                Self::row_to_entry,
            )
            .optional()?;

        Ok(entry)
    }

    async fn get_latest(&self) -> Result<Option<CacheEntry>> {
        let conn = self.db.conn()?;

        let entry = conn
            .query_row(
                "SELECT id, data, timestamp FROM server_stats_cache
                 ORDER BY timestamp DESC, id DESC
                 LIMIT 1",
                [],
                Self::row_to_entry,
            )
            .optional()?;

        Ok(entry)
    }

    async fn put(&self, snapshot: &Snapshot, now: i64, window: i64) -> Result<()> {
        let data = snapshot.to_json()?;
        let conn = self.db.conn()?;

        let evicted = conn.execute(
            "DELETE FROM server_stats_cache WHERE timestamp < ?1",
            params![now.saturating_sub(window.saturating_mul(2))],
        )?;
        if evicted > 0 {
            tracing::debug!("Evicted {} stale cache entries", evicted);
        }

        conn.execute(
            "INSERT INTO server_stats_cache (data, timestamp) VALUES (?1, ?2)",
            params![data, now],
        )?;

        Ok(())
    }

    async fn evict_older_than(&self, cutoff: i64) -> Result<u64> {
        let conn = self.db.conn()?;

        let deleted = conn.execute(
            "DELETE FROM server_stats_cache WHERE timestamp < ?1",
            params![cutoff],
        )?;

        Ok(deleted as u64)
    }

    async fn daily_max(&self, since: i64) -> Result<Vec<DailyMax>> {
        let conn = self.db.conn()?;

        let mut stmt = conn.prepare(
            "SELECT date(timestamp, 'unixepoch') AS day,
                    MAX(CAST(json_extract(data, '$.players') AS INTEGER))
             FROM server_stats_cache
             WHERE timestamp >= ?1
             GROUP BY day
             ORDER BY day ASC",
        )?;

        let rows = stmt.query_map(params![since], |row| {
            Ok(DailyMax {
                date: parse_date_column(row, 0)?,
                players: row.get(1)?,
            })
        })?;

        let days = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }

    async fn stats(&self) -> Result<TableStats> {
        let conn = self.db.conn()?;
        TableStats::query(&conn, "server_stats_cache")
    }
}
