use thiserror::Error;

/// Why a live fetch from the upstream server list did not yield a snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Connection refused, DNS failure, reset, ...
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Upstream answered with a non-200 status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Body was not the expected JSON envelope
    #[error("malformed response: {0}")]
    Malformed(String),

    /// `response.servers` was missing or empty
    #[error("no server matched the address filter")]
    NoServers,

    /// The HTTP client itself could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Main error type for the stats engine
#[derive(Error, Debug)]
pub enum StatsError {
    /// Upstream fetch failures
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchFailure),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage handle errors that are not SQL errors (poisoned lock, ...)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl StatsError {
    /// True for failures that originate in the SQLite layer
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StatsError::Database(_) | StatsError::Json(_) | StatsError::Storage(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        assert!(StatsError::Storage("poisoned".into()).is_storage());
        assert!(StatsError::Database(rusqlite::Error::QueryReturnedNoRows).is_storage());
        assert!(!StatsError::Fetch(FetchFailure::Timeout).is_storage());
        assert!(!StatsError::Config("bad".into()).is_storage());
    }

    #[test]
    fn test_fetch_failure_display() {
        let err: StatsError = FetchFailure::Status(503).into();
        assert_eq!(err.to_string(), "Fetch failed: unexpected HTTP status 503");
    }
}
