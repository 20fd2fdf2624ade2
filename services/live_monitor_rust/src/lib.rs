//! Live Monitor Library
//!
//! Detection, attribution, dedup and formatting of live match events,
//! exposed for the binary and for integration tests.

pub mod attribution;
pub mod config;
pub mod filters;
pub mod formatters;
pub mod monitor;
pub mod score;
pub mod state;
pub mod teams;

// Re-export commonly used types
pub use config::Config;
pub use filters::{filter_by_league, DispatchThrottle, LeagueFilter};
pub use formatters::{render, render_startup_message, MessageContext};
pub use monitor::{CycleError, CycleReport, LoopState, MonitorSettings, MonitoringLoop, SnapshotError};
pub use state::{ClaimResult, DedupStateStore};
pub use teams::TeamMapping;
