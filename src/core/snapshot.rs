use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One point-in-time reading of a game server
///
/// Serialized as JSON into the `server_stats_cache.data` column:
/// ```json
/// {"players":42,"max_players":100,"server_name":"S","map":"M","timestamp":1700000000}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Connected players
    pub players: u32,

    /// Server slot count
    pub max_players: u32,

    /// Server display name
    pub server_name: String,

    /// Current map
    pub map: String,

    /// Unix seconds at which the reading was taken
    pub timestamp: i64,
}

impl Snapshot {
    pub fn new(
        players: u32,
        max_players: u32,
        server_name: impl Into<String>,
        map: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            players,
            max_players,
            server_name: server_name.into(),
            map: map.into(),
            timestamp,
        }
    }

    /// Placeholder served when no live, cached or persisted reading exists
    pub fn placeholder(server_name: impl Into<String>, map: impl Into<String>, now: i64) -> Self {
        Self::new(0, DEFAULT_MAX_PLAYERS, server_name, map, now)
    }

    /// Reading time as a UTC datetime
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Slot count assumed when upstream omits it
pub const DEFAULT_MAX_PLAYERS: u32 = 100;

/// Floor of the mean player count within one hour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourlyAverage {
    /// Unix seconds of the start of the hour
    pub hour: i64,
    pub players: u32,
}

/// Highest player count seen on one UTC calendar date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyMax {
    pub date: NaiveDate,
    pub players: u32,
}

/// UTC calendar date of a unix timestamp
pub fn utc_date(timestamp: i64) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Unix seconds of UTC midnight `days` days before the date of `now`
///
/// Ranges reaching past the earliest representable date start there.
pub fn start_of_day_before(now: i64, days: u32) -> i64 {
    let date = utc_date(now)
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(i64::MIN)
}
