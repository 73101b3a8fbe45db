//! Scripted fetcher for tests and benchmarks
//!
//! Replays a queue of canned outcomes instead of calling upstream and counts
//! how often it was asked.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::ServerAddress;
use crate::core::Snapshot;
use crate::error::{FetchFailure, Result, StatsError};
use crate::providers::StatsFetcher;

/// Fetcher returning pre-programmed outcomes in order
///
/// Once the queue is drained every call fails with
/// [`FetchFailure::NoServers`], or returns the `repeat` snapshot when set.
#[derive(Default)]
pub struct ScriptedFetcher {
    outcomes: Mutex<VecDeque<std::result::Result<Snapshot, FetchFailure>>>,
    repeat: Option<Snapshot>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `snapshot`
    pub fn always(snapshot: Snapshot) -> Self {
        Self {
            repeat: Some(snapshot),
            ..Self::default()
        }
    }

    /// Always fail with `failure`
    pub fn failing(failure: FetchFailure) -> Self {
        let fetcher = Self::default();
        fetcher.push_failure(failure);
        fetcher
    }

    pub fn push_snapshot(&self, snapshot: Snapshot) {
        self.queue().push_back(Ok(snapshot));
    }

    pub fn push_failure(&self, failure: FetchFailure) {
        self.queue().push_back(Err(failure));
    }

    /// Number of `fetch` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<Snapshot, FetchFailure>>> {
        // A poisoned queue still holds valid outcomes
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StatsFetcher for ScriptedFetcher {
    async fn fetch(&self, _address: &ServerAddress) -> Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut queue = self.queue();
        let outcome = if queue.len() > 1 || (queue.len() == 1 && self.repeat.is_some()) {
            queue.pop_front()
        } else {
            // Last scripted outcome sticks
            queue.front().cloned()
        };
        drop(queue);

        match outcome {
            Some(outcome) => outcome.map_err(StatsError::from),
            None => self
                .repeat
                .clone()
                .ok_or(StatsError::Fetch(FetchFailure::NoServers)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ServerAddress {
        ServerAddress::new("127.0.0.1", 27015)
    }

    #[tokio::test]
    async fn test_replays_in_order_and_sticks_on_last() {
        let fetcher = ScriptedFetcher::new();
        fetcher.push_snapshot(Snapshot::new(1, 10, "S", "M", 0));
        fetcher.push_failure(FetchFailure::Timeout);

        assert_eq!(fetcher.fetch(&address()).await.unwrap().players, 1);
        assert!(fetcher.fetch(&address()).await.is_err());
        assert!(fetcher.fetch(&address()).await.is_err());
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let fetcher = ScriptedFetcher::new();
        let err = fetcher.fetch(&address()).await.unwrap_err();
        assert!(matches!(err, StatsError::Fetch(FetchFailure::NoServers)));
    }

    #[tokio::test]
    async fn test_always() {
        let fetcher = ScriptedFetcher::always(Snapshot::new(5, 10, "S", "M", 0));
        for _ in 0..3 {
            assert_eq!(fetcher.fetch(&address()).await.unwrap().players, 5);
        }
    }
}
