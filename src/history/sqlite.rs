use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use crate::core::snapshot::start_of_day_before;
use crate::core::{DailyMax, HourlyAverage, Snapshot};
use crate::error::Result;
use crate::history::{HistoryRecord, HistoryStore};
use crate::storage::{Database, TableStats};

/// SQLite-backed history over the `server_stats` table
#[derive(Clone)]
pub struct SqliteHistory {
    db: Database,
}

impl SqliteHistory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Read a `YYYY-MM-DD` text column produced by SQLite's `date()`
pub(crate) fn parse_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn append(&self, snapshot: &Snapshot) -> Result<()> {
        let conn = self.db.conn()?;

        conn.execute(
            "INSERT INTO server_stats (players, max_players, server_name, map, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.players,
                snapshot.max_players,
                snapshot.server_name,
                snapshot.map,
                snapshot.timestamp,
            ],
        )?;

        Ok(())
    }

    async fn latest(&self) -> Result<Option<HistoryRecord>> {
        let conn = self.db.conn()?;

        let record = conn
            .query_row(
                "SELECT id, players, max_players, server_name, map, timestamp
                 FROM server_stats
                 ORDER BY timestamp DESC, id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok(HistoryRecord {
                        id: row.get(0)?,
                        players: row.get(1)?,
                        max_players: row.get(2)?,
                        server_name: row.get(3)?,
                        map: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    async fn hourly_average(&self, now: i64, since_hours: u32) -> Result<Vec<HourlyAverage>> {
        let since = now - i64::from(since_hours) * 3600;
        let conn = self.db.conn()?;

        // CAST truncates toward zero, which is floor for non-negative averages
        let mut stmt = conn.prepare(
            "SELECT (timestamp / 3600) * 3600 AS hour,
                    CAST(AVG(players) AS INTEGER)
             FROM server_stats
             WHERE timestamp > ?1
             GROUP BY hour
             ORDER BY hour ASC",
        )?;

        let rows = stmt.query_map(params![since], |row| {
            Ok(HourlyAverage {
                hour: row.get(0)?,
                players: row.get(1)?,
            })
        })?;

        let hours = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hours)
    }

    async fn daily_max(&self, now: i64, since_days: u32) -> Result<Vec<DailyMax>> {
        let since = start_of_day_before(now, since_days);
        let conn = self.db.conn()?;

        let mut stmt = conn.prepare(
            "SELECT date(timestamp, 'unixepoch') AS day, MAX(players)
             FROM server_stats
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

    async fn prune(&self, cutoff: i64) -> Result<u64> {
        let conn = self.db.conn()?;

        let deleted = conn.execute(
            "DELETE FROM server_stats WHERE timestamp < ?1",
            params![cutoff],
        )?;

        Ok(deleted as u64)
    }

    async fn stats(&self) -> Result<TableStats> {
        let conn = self.db.conn()?;
        TableStats::query(&conn, "server_stats")
    }
}
