//! Runtime configuration.
//!
//! Loaded from an optional YAML file, then overridden from the environment:
//!
//! | Variable                | Field      |
//! |-------------------------|------------|
//! | `STEAM_API_KEY`         | `api_key`  |
//! | `SERVER_STATS_API_BASE` | `api_base` |
//! | `SERVER_STATS_ADDR`     | `server`   |
//! | `SERVER_STATS_DB`       | `db_path`  |
//!
//! ```yaml
//! api_key: "XXXXXXXX"
//! server:
//!   ip: 203.0.113.7
//!   port: 27015
//! freshness_window_secs: 300
//! daily_max_source: history
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, StatsError};

/// Game server `ip:port` used as the upstream address filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddress {
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl FromStr for ServerAddress {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        let (ip, port) = match s.rsplit_once(':') {
            Some((ip, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| StatsError::Config(format!("invalid port in address '{}'", s)))?;
                (ip, port)
            }
            None => (s, default_port()),
        };

        if ip.trim().is_empty() {
            return Err(StatsError::Config(format!("missing host in address '{}'", s)));
        }

        Ok(Self::new(ip.trim(), port))
    }
}

/// Table `daily_max` aggregates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DailyMaxSource {
    /// Every persisted reading
    #[default]
    History,
    /// Only the readings still in the cache table
    Cache,
}

/// Upper bound for `freshness_window_secs`
pub const MAX_FRESHNESS_WINDOW_SECS: i64 = 365 * 86_400;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API base URL
    pub api_base: String,

    /// Upstream API key (empty means every fetch fails upstream)
    pub api_key: String,

    /// Monitored server
    pub server: ServerAddress,

    /// SQLite database path
    pub db_path: String,

    /// Seconds a cached snapshot is served without re-fetching
    pub freshness_window_secs: i64,

    /// Days of history kept by `cleanup`
    pub retention_days: u32,

    /// Upstream request timeout
    pub request_timeout_secs: u64,

    /// `User-Agent` sent upstream
    pub user_agent: String,

    /// Name served when nothing else is available
    pub default_server_name: String,

    /// Map served when nothing else is available
    pub default_map: String,

    pub daily_max_source: DailyMaxSource,
}

fn default_port() -> u16 {
    27015
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.steampowered.com/".to_string(),
            api_key: String::new(),
            server: ServerAddress::new("127.0.0.1", default_port()),
            db_path: "server_stats.db".to_string(),
            freshness_window_secs: 300,
            retention_days: 30,
            request_timeout_secs: 10,
            user_agent: format!("server-stats-engine/{}", crate::VERSION),
            default_server_name: "Venom Roleplay".to_string(),
            default_map: "rp_downtown_v4c_v2".to_string(),
            daily_max_source: DailyMaxSource::History,
        }
    }
}

impl Config {
    /// Load from `path` (if given), apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        if config.api_key.is_empty() {
            tracing::warn!("No API key configured, live fetches will fail and fall back");
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StatsError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| StatsError::Config(e.to_string()))
    }

    /// Override fields from a variable lookup (normally the process environment)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("STEAM_API_KEY") {
            self.api_key = key;
        }
        if let Some(base) = lookup("SERVER_STATS_API_BASE") {
            self.api_base = base;
        }
        if let Some(addr) = lookup("SERVER_STATS_ADDR") {
            self.server = addr.parse()?;
        }
        if let Some(db) = lookup("SERVER_STATS_DB") {
            self.db_path = db;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.freshness_window_secs <= 0 {
            return Err(StatsError::Config(
                "freshness_window_secs must be positive".to_string(),
            ));
        }
        if self.freshness_window_secs > MAX_FRESHNESS_WINDOW_SECS {
            return Err(StatsError::Config(format!(
                "freshness_window_secs must be at most {} (one year)",
                MAX_FRESHNESS_WINDOW_SECS
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(StatsError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.server.ip.trim().is_empty() || self.server.port == 0 {
            return Err(StatsError::Config(format!(
                "invalid server address '{}'",
                self.server
            )));
        }
        if self.db_path.is_empty() {
            return Err(StatsError::Config("db_path must not be empty".to_string()));
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(StatsError::Config(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }
        Ok(())
    }
}
