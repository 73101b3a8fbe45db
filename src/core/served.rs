use serde::{Deserialize, Serialize};

use crate::core::Snapshot;

/// Where a served snapshot came from, in fallback order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Cache entry inside the freshness window
    FreshCache,
    /// Fetched from upstream during this call
    Live,
    /// Cache entry past the freshness window (fetch failed)
    StaleCache,
    /// Newest persisted history row (fetch failed, cache empty)
    History,
    /// Hardcoded placeholder (nothing available anywhere)
    Default,
}

impl Source {
    /// Served from something other than a fresh reading
    pub fn is_degraded(&self) -> bool {
        matches!(self, Source::StaleCache | Source::History | Source::Default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::FreshCache => "fresh cache",
            Source::Live => "live fetch",
            Source::StaleCache => "stale cache",
            Source::History => "history",
            Source::Default => "default",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the "current stats" query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServedSnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub source: Source,
}

impl ServedSnapshot {
    pub fn new(snapshot: Snapshot, source: Source) -> Self {
        Self { snapshot, source }
    }

    pub fn is_degraded(&self) -> bool {
        self.source.is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_sources() {
        assert!(!Source::FreshCache.is_degraded());
        assert!(!Source::Live.is_degraded());
        assert!(Source::StaleCache.is_degraded());
        assert!(Source::History.is_degraded());
        assert!(Source::Default.is_degraded());
    }

    #[test]
    fn test_served_serialization_is_flat() {
        let served = ServedSnapshot::new(Snapshot::new(1, 2, "S", "M", 3), Source::StaleCache);
        let json = serde_json::to_value(&served).unwrap();
        assert_eq!(json["players"], 1);
        assert_eq!(json["source"], "stale_cache");
    }
}
