use std::collections::HashSet;
use std::time::{Duration, Instant};
use tippzone_rust_core::models::MatchSnapshot;
use tippzone_rust_core::DispatchError;

/// Keep only snapshots whose league is on the allow-list, preserving input order.
/// A snapshot without a league id is excluded.
pub fn filter_by_league(snapshots: Vec<MatchSnapshot>, allowlist: &HashSet<i64>) -> Vec<MatchSnapshot> {
    snapshots
        .into_iter()
        .filter(|s| s.league_id.map(|id| allowlist.contains(&id)).unwrap_or(false))
        .collect()
}

#[derive(Debug, Clone)]
pub struct LeagueFilter {
    allowlist: HashSet<i64>,
}

impl LeagueFilter {
    pub fn new(allowlist: HashSet<i64>) -> Self {
        Self { allowlist }
    }

    pub fn apply(&self, snapshots: Vec<MatchSnapshot>) -> Vec<MatchSnapshot> {
        filter_by_league(snapshots, &self.allowlist)
    }

    pub fn len(&self) -> usize {
        self.allowlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowlist.is_empty()
    }
}

/// Minimum spacing between two outbound messages on the channel
#[derive(Debug)]
pub struct DispatchThrottle {
    min_spacing: Duration,
    last_sent: Option<Instant>,
}

impl DispatchThrottle {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_sent: None,
        }
    }

    /// `Err(RateLimited)` with the remaining wait when a send at `now` would be too early
    pub fn check(&self, now: Instant) -> Result<(), DispatchError> {
        let remaining = self.remaining(now);
        if remaining.is_zero() {
            Ok(())
        } else {
            Err(DispatchError::RateLimited {
                retry_after: remaining,
            })
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_sent {
            Some(last) => self
                .min_spacing
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}
