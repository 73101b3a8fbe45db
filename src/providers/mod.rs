pub mod steam;
pub mod scripted;

use async_trait::async_trait;
use crate::config::ServerAddress;
use crate::core::Snapshot;
use crate::error::Result;

pub use scripted::ScriptedFetcher;
pub use steam::SteamServerList;

/// Source of live server readings
///
/// Implementations normalize whatever upstream returns into a fully
/// populated [`Snapshot`], or fail with [`crate::error::FetchFailure`].
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    /// Fetch the current state of the server at `address`
    async fn fetch(&self, address: &ServerAddress) -> Result<Snapshot>;

    /// Get provider name
    fn name(&self) -> &str;
}
