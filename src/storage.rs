use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StatsError};

/// Shared SQLite handle for the cache and history tables
///
/// Opened once by the entry point and handed to each store. Cloning is
/// cheap and shares the same connection.
///
/// ```sql
/// CREATE TABLE server_stats_cache (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     data TEXT NOT NULL,
///     timestamp INTEGER NOT NULL
/// );
/// CREATE TABLE server_stats (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     players INTEGER NOT NULL,
///     max_players INTEGER NOT NULL,
///     server_name TEXT NOT NULL,
///     map TEXT NOT NULL,
///     timestamp INTEGER NOT NULL
/// );
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists
    ///
    /// `":memory:"` gives a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS server_stats_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_stats_cache_timestamp
                ON server_stats_cache(timestamp);
            CREATE TABLE IF NOT EXISTS server_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                players INTEGER NOT NULL,
                max_players INTEGER NOT NULL,
                server_name TEXT NOT NULL,
                map TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_stats_timestamp
                ON server_stats(timestamp);",
        )?;

        tracing::debug!("Schema ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the connection for one statement or transaction
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StatsError::Storage("connection lock poisoned".to_string()))
    }
}

/// Row count and timestamp range of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableStats {
    pub total_entries: u64,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

impl TableStats {
    pub(crate) fn query(conn: &Connection, table: &str) -> Result<Self> {
        let sql = format!("SELECT COUNT(*), MIN(timestamp), MAX(timestamp) FROM {}", table);
        let stats = conn.query_row(&sql, [], |row| {
            Ok(TableStats {
                total_entries: row.get(0)?,
                oldest_entry: row.get(1)?,
                newest_entry: row.get(2)?,
            })
        })?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let db = Database::open(":memory:").unwrap();
        let conn = db.conn().unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('server_stats_cache', 'server_stats')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_open_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE server_stats_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );",
        )
        .unwrap();
        assert!(Database::from_connection(conn).is_ok());
    }

    #[test]
    fn test_table_stats_empty() {
        let db = Database::open(":memory:").unwrap();
        let conn = db.conn().unwrap();
        let stats = TableStats::query(&conn, "server_stats").unwrap();
        assert_eq!(stats, TableStats::default());
    }
}
