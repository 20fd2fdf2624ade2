//! Collaborator abstractions
//!
//! The monitoring loop only talks to the outside world through these two
//! traits, so the engine can be driven by in-memory fakes in tests:
//! - `SnapshotSource`: live match snapshots (SportMonks in production)
//! - `NotificationChannel`: outbound text messages (Telegram in production)

use crate::error::{DispatchError, FetchError};
use crate::models::MatchSnapshot;
use async_trait::async_trait;

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch every currently live match. Retries happen inside; an `Err`
    /// means the retry budget is exhausted.
    async fn fetch_live(&self) -> Result<Vec<MatchSnapshot>, FetchError>;

    /// Provider name for logging and debugging
    fn provider_name(&self) -> &str;
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DispatchError>;

    fn channel_name(&self) -> &str;
}
