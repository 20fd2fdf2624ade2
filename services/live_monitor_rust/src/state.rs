//! Per-match dedup state
//!
//! Tracks which sub-events already produced a notification and the last
//! summarized state of every live match. Entries are removed when a match
//! reaches a terminal status, or when the match has not been seen for a while.
//! Matches cleaned up at a terminal status are remembered until the idle TTL
//! passes, so a final snapshot that lingers in the feed is not replayed.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tippzone_rust_core::models::{MatchSnapshot, MatchSummary};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct MatchProcessingState {
    pub match_id: i64,
    pub notified: HashSet<i64>,
    pub last_summary: Option<MatchSummary>,
    pub last_seen: Instant,
}

impl MatchProcessingState {
    fn new(match_id: i64, now: Instant) -> Self {
        Self {
            match_id,
            notified: HashSet::new(),
            last_summary: None,
            last_seen: now,
        }
    }
}

/// Result of claiming a sub-event for notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// First sighting; the caller owns the notification
    New,
    /// Already notified
    Duplicate,
}

#[derive(Debug, Default)]
pub struct DedupStateStore {
    matches: Mutex<HashMap<i64, MatchProcessingState>>,
    finished: Mutex<HashMap<i64, Instant>>,
}

impl DedupStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self, match_id: i64, sub_event_id: i64) -> bool {
        self.matches
            .lock()
            .get(&match_id)
            .map(|state| !state.notified.contains(&sub_event_id))
            .unwrap_or(true)
    }

    /// Returns `true` if the id was not recorded before
    pub fn mark_notified(&self, match_id: i64, sub_event_id: i64) -> bool {
        let now = Instant::now();
        let mut matches = self.matches.lock();
        matches
            .entry(match_id)
            .or_insert_with(|| MatchProcessingState::new(match_id, now))
            .notified
            .insert(sub_event_id)
    }

    /// Check and mark under one lock
    pub fn claim(&self, match_id: i64, sub_event_id: i64) -> ClaimResult {
        if self.mark_notified(match_id, sub_event_id) {
            ClaimResult::New
        } else {
            debug!(
                "Duplicate sub-event {} for match {}, skipping",
                sub_event_id, match_id
            );
            ClaimResult::Duplicate
        }
    }

    /// Create the entry on first sight and refresh its last-seen instant
    pub fn touch(&self, match_id: i64, now: Instant) {
        let mut matches = self.matches.lock();
        matches
            .entry(match_id)
            .and_modify(|state| state.last_seen = now)
            .or_insert_with(|| MatchProcessingState::new(match_id, now));
    }

    /// Store the latest summary and return the previous one. Score changes are
    /// logged at info, yellow-card changes at debug.
    pub fn record_snapshot_summary(
        &self,
        match_id: i64,
        summary: MatchSummary,
    ) -> Option<MatchSummary> {
        let now = Instant::now();
        let mut matches = self.matches.lock();
        let state = matches
            .entry(match_id)
            .or_insert_with(|| MatchProcessingState::new(match_id, now));
        state.last_seen = now;

        if let Some(previous) = &state.last_summary {
            if previous.score != summary.score {
                info!(
                    "Match {} score changed: {} -> {}",
                    match_id, previous.score, summary.score
                );
            }
            let (prev_home, prev_away) = (
                previous.statistics.home.yellow_cards,
                previous.statistics.away.yellow_cards,
            );
            let (home, away) = (
                summary.statistics.home.yellow_cards,
                summary.statistics.away.yellow_cards,
            );
            if (prev_home, prev_away) != (home, away) {
                debug!(
                    "Match {} yellow cards: {}-{} -> {}-{}",
                    match_id, prev_home, prev_away, home, away
                );
            }
            if previous.period != summary.period {
                debug!(
                    "Match {} period: {:?} -> {:?} ({})",
                    match_id,
                    previous.period,
                    summary.period,
                    summary.status.code()
                );
            }
        }

        state.last_summary.replace(summary)
    }

    pub fn last_summary(&self, match_id: i64) -> Option<MatchSummary> {
        self.matches
            .lock()
            .get(&match_id)
            .and_then(|state| state.last_summary.clone())
    }

    /// Drop everything tracked for a match
    pub fn cleanup(&self, match_id: i64) -> bool {
        let removed = self.matches.lock().remove(&match_id);
        if let Some(state) = &removed {
            info!(
                "Cleaned up match {} ({} notified events)",
                match_id,
                state.notified.len()
            );
        }
        removed.is_some()
    }

    /// Clean up every tracked match whose snapshot carries a terminal status
    /// and remember it as finished
    pub fn sweep_terminal<'a, I>(&self, snapshots: I, now: Instant) -> Vec<i64>
    where
        I: IntoIterator<Item = &'a MatchSnapshot>,
    {
        let cleaned: Vec<i64> = snapshots
            .into_iter()
            .filter(|s| s.is_terminal())
            .filter_map(|s| self.cleanup(s.match_id).then_some(s.match_id))
            .collect();
        let mut finished = self.finished.lock();
        for match_id in &cleaned {
            finished.insert(*match_id, now);
        }
        cleaned
    }

    /// Cleaned up at a terminal status and not yet forgotten
    pub fn is_finished(&self, match_id: i64) -> bool {
        self.finished.lock().contains_key(&match_id)
    }

    /// Drop matches not seen within `ttl`. Matches can leave the in-play feed
    /// without ever reporting a terminal status. Finished markers older than
    /// `ttl` are forgotten as well.
    pub fn evict_idle(&self, ttl: Duration, now: Instant) -> Vec<i64> {
        let mut matches = self.matches.lock();
        let stale: Vec<i64> = matches
            .values()
            .filter(|state| now.saturating_duration_since(state.last_seen) > ttl)
            .map(|state| state.match_id)
            .collect();
        for match_id in &stale {
            matches.remove(match_id);
        }
        if !stale.is_empty() {
            info!("Evicted {} idle matches: {:?}", stale.len(), stale);
        }
        drop(matches);

        self.finished
            .lock()
            .retain(|_, at| now.saturating_duration_since(*at) <= ttl);
        stale
    }

    pub fn is_tracked(&self, match_id: i64) -> bool {
        self.matches.lock().contains_key(&match_id)
    }

    pub fn notified_count(&self, match_id: i64) -> usize {
        self.matches
            .lock()
            .get(&match_id)
            .map(|state| state.notified.len())
            .unwrap_or(0)
    }

    pub fn tracked_matches(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.matches.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.matches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.lock().is_empty()
    }
}
