//! # Server Stats Engine
//!
//! Scheduled poller for game server statistics with:
//! - Steam `GetServerList` provider
//! - SQLite freshness cache and append-only history
//! - Layered fallback: fresh cache → live fetch → stale cache → history → placeholder
//! - Hourly average and daily maximum history queries
//! - Interfaces: Rust library, CLI, optional HTTP read API
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use server_stats_engine::{Config, Database, StatsService, ServiceOptions};
//! use server_stats_engine::providers::SteamServerList;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let db = Database::open(&config.db_path)?;
//!     let fetcher = Arc::new(SteamServerList::new(&config)?);
//!
//!     let service = StatsService::with_database(db, fetcher, ServiceOptions::from(&config));
//!     let served = service.get_server_info().await;
//!
//!     println!("{} players ({})", served.snapshot.players, served.source);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod cache;
pub mod history;
pub mod providers;
pub mod service;
pub mod storage;
pub mod clock;
pub mod config;
pub mod logging;
pub mod error;

// Re-export primary types
pub use crate::core::{DailyMax, HourlyAverage, ServedSnapshot, Snapshot, Source};
pub use service::{CleanupReport, CycleReport, ServiceOptions, StatsService};
pub use config::{Config, DailyMaxSource, ServerAddress};
pub use error::{FetchFailure, Result, StatsError};
pub use cache::{CacheEntry, FreshnessCache};
pub use history::{HistoryRecord, HistoryStore};
pub use storage::Database;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
