//! TippZone Core - shared models and provider plumbing for the live notifier.
//!
//! This module provides:
//! - Domain models for live match snapshots and canonical events
//! - SportMonks in-play client (snapshot fetcher with bounded retry)
//! - Telegram Bot API client (notification channel)
//! - Collaborator traits so the engine can run against fakes
//! - Error taxonomy for the fetch and dispatch boundaries

pub mod clients;
pub mod error;
pub mod models;
pub mod providers;
pub mod retry;

pub use error::{DispatchError, FetchError};
pub use providers::{NotificationChannel, SnapshotSource};
