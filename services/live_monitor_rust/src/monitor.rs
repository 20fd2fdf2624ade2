//! Poll → filter → process → cleanup → sleep loop

use crate::attribution;
use crate::config::{
    Config, DEFAULT_DISPATCH_SPACING_MS, DEFAULT_ERROR_RECOVERY_DELAY_SECS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STALE_MATCH_TTL_SECS,
};
use crate::filters::{DispatchThrottle, LeagueFilter};
use crate::formatters::{self, MessageContext};
use crate::score;
use crate::state::{ClaimResult, DedupStateStore};
use crate::teams::TeamMapping;
use chrono_tz::Tz;
use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tippzone_rust_core::models::{MatchSnapshot, MatchSummary, Side};
use tippzone_rust_core::retry::{Sleeper, TokioSleeper};
use tippzone_rust_core::{DispatchError, NotificationChannel, SnapshotSource};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Upper bound on a channel-requested wait before the single resend
const MAX_RESEND_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub destination: String,
    pub league_allowlist: HashSet<i64>,
    pub poll_interval: Duration,
    pub dispatch_spacing: Duration,
    pub error_recovery_delay: Duration,
    pub stale_match_ttl: Duration,
    pub timezone: Tz,
}

impl MonitorSettings {
    pub fn new(destination: impl Into<String>, league_allowlist: HashSet<i64>) -> Self {
        Self {
            destination: destination.into(),
            league_allowlist,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            dispatch_spacing: Duration::from_millis(DEFAULT_DISPATCH_SPACING_MS),
            error_recovery_delay: Duration::from_secs(DEFAULT_ERROR_RECOVERY_DELAY_SECS),
            stale_match_ttl: Duration::from_secs(DEFAULT_STALE_MATCH_TTL_SECS),
            timezone: chrono_tz::Europe::Budapest,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            destination: cfg.telegram_channel_id.clone(),
            league_allowlist: cfg.league_allowlist.clone(),
            poll_interval: cfg.poll_interval,
            dispatch_spacing: cfg.dispatch_spacing,
            error_recovery_delay: cfg.error_recovery_delay,
            stale_match_ttl: cfg.stale_match_ttl,
            timezone: cfg.display_timezone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Polling,
    Processing,
    Sleeping,
    Stopped,
}

/// A single match could not be processed; the rest of the cycle goes on
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("match {match_id} has no {side} contestant")]
    MissingContestant { match_id: i64, side: &'static str },
}

/// Unexpected failure of a whole cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("monitoring cycle panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetch_failed: bool,
    pub fetched: usize,
    pub monitored: usize,
    pub new_events: usize,
    pub notifications_sent: usize,
    pub dispatch_failures: usize,
    pub skipped_matches: usize,
    pub cleaned_up: Vec<i64>,
    pub evicted: Vec<i64>,
}

pub struct MonitoringLoop {
    source: Arc<dyn SnapshotSource>,
    channel: Arc<dyn NotificationChannel>,
    store: Arc<DedupStateStore>,
    settings: MonitorSettings,
    filter: LeagueFilter,
    throttle: DispatchThrottle,
    sleeper: Arc<dyn Sleeper>,
    state: LoopState,
}

impl MonitoringLoop {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        channel: Arc<dyn NotificationChannel>,
        store: Arc<DedupStateStore>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            filter: LeagueFilter::new(settings.league_allowlist.clone()),
            throttle: DispatchThrottle::new(settings.dispatch_spacing),
            source,
            channel,
            store,
            settings,
            sleeper: Arc::new(TokioSleeper),
            state: LoopState::Idle,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn store(&self) -> &Arc<DedupStateStore> {
        &self.store
    }

    /// Run until `shutdown` turns true (or its sender goes away). The signal is
    /// checked before every fetch and interrupts the sleep between cycles.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Live monitor started: source={} channel={} interval={:?} leagues={}",
            self.source.provider_name(),
            self.channel.channel_name(),
            self.settings.poll_interval,
            self.filter.len()
        );
        if self.filter.is_empty() {
            warn!("League allow-list is empty, no match will be monitored");
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            let delay = match self.run_guarded_cycle().await {
                Ok(report) => {
                    if report.new_events > 0 || !report.cleaned_up.is_empty() {
                        info!(
                            "Cycle done: {} new events, {} sent, {} failed, {} cleaned up",
                            report.new_events,
                            report.notifications_sent,
                            report.dispatch_failures,
                            report.cleaned_up.len()
                        );
                    }
                    self.settings.poll_interval.saturating_sub(started.elapsed())
                }
                Err(e) => {
                    error!("{}", e);
                    self.settings.error_recovery_delay
                }
            };

            self.state = LoopState::Sleeping;
            if delay.is_zero() {
                continue;
            }
            tokio::select! {
                _ = self.sleeper.sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown sender dropped, stopping monitor");
                        break;
                    }
                }
            }
        }

        self.state = LoopState::Stopped;
        info!(
            "Live monitor stopped ({} matches still tracked)",
            self.store.len()
        );
    }

    /// `run_cycle` with panics turned into a `CycleError`
    pub async fn run_guarded_cycle(&mut self) -> Result<CycleReport, CycleError> {
        AssertUnwindSafe(self.run_cycle())
            .catch_unwind()
            .await
            .map_err(|payload| CycleError::Panicked(panic_message(payload.as_ref())))
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        self.state = LoopState::Polling;
        let snapshots = match self.source.fetch_live().await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(
                    "Fetching live matches from {} failed: {}",
                    self.source.provider_name(),
                    e
                );
                report.fetch_failed = true;
                Vec::new()
            }
        };
        report.fetched = snapshots.len();

        if snapshots.is_empty() {
            debug!("No live matches");
            report.evicted = self
                .store
                .evict_idle(self.settings.stale_match_ttl, Instant::now());
            return report;
        }

        self.state = LoopState::Processing;
        let matches = self.filter.apply(snapshots);
        report.monitored = matches.len();
        info!(
            "Live matches: {} fetched, {} monitored",
            report.fetched, report.monitored
        );

        for snapshot in &matches {
            if let Err(e) = self.process_match(snapshot, &mut report).await {
                warn!("Skipping match {}: {}", snapshot.match_id, e);
                report.skipped_matches += 1;
            }
        }

        let now = Instant::now();
        report.cleaned_up = self.store.sweep_terminal(&matches, now);
        report.evicted = self.store.evict_idle(self.settings.stale_match_ttl, now);
        report
    }

    async fn process_match(
        &mut self,
        snapshot: &MatchSnapshot,
        report: &mut CycleReport,
    ) -> Result<(), SnapshotError> {
        let match_id = snapshot.match_id;
        let home = snapshot
            .contestant(Side::Home)
            .ok_or(SnapshotError::MissingContestant {
                match_id,
                side: Side::Home.as_str(),
            })?;
        let away = snapshot
            .contestant(Side::Away)
            .ok_or(SnapshotError::MissingContestant {
                match_id,
                side: Side::Away.as_str(),
            })?;

        // Cleaned up at an earlier terminal snapshot; replaying its events
        // would notify them a second time.
        if snapshot.is_terminal() && self.store.is_finished(match_id) {
            debug!(
                "Match {} already finished ({}), ignoring",
                match_id,
                snapshot.clock.status.code()
            );
            return Ok(());
        }
        if snapshot.is_terminal() && !self.store.is_tracked(match_id) {
            info!(
                "Match {} first seen already finished ({}), notifying its events once",
                match_id,
                snapshot.clock.status.code()
            );
        }

        self.store.touch(match_id, Instant::now());

        let mapping = TeamMapping::build(snapshot);
        let events = attribution::extract(snapshot, &mapping);
        let ctx = MessageContext {
            home: &home.name,
            away: &away.name,
            league: snapshot.league_name.as_deref(),
            kickoff: snapshot.starting_at.as_deref(),
            timezone: self.settings.timezone,
        };

        for event in &events {
            if self.store.claim(match_id, event.id) == ClaimResult::Duplicate {
                continue;
            }
            report.new_events += 1;

            let score = event
                .category
                .is_goal()
                .then(|| score::tally_until(&events, event.ordering_key()));
            let text = formatters::render(event, &ctx, score);

            info!(
                "New {} in match {} ({} vs {}): event {} at {}",
                event.category.as_str(),
                match_id,
                home.name,
                away.name,
                event.id,
                formatters::format_minute(event)
            );

            match self.dispatch(&text).await {
                Ok(()) => report.notifications_sent += 1,
                Err(e) => {
                    report.dispatch_failures += 1;
                    if e.is_transient() {
                        warn!("Notification for event {} lost: {}", event.id, e);
                    } else {
                        error!("Notification for event {} rejected: {}", event.id, e);
                    }
                }
            }
        }

        if let Some(last) = events.last() {
            let rebuilt = score::tally_until(&events, last.ordering_key());
            if rebuilt != snapshot.score {
                debug!(
                    "Match {} rebuilt score {} differs from headline {}",
                    match_id, rebuilt, snapshot.score
                );
            }
        }

        self.store
            .record_snapshot_summary(match_id, MatchSummary::from_snapshot(snapshot));
        Ok(())
    }

    /// Send with the minimum spacing respected. A rate-limit answer from the
    /// channel gets exactly one resend after the requested wait.
    async fn dispatch(&mut self, text: &str) -> Result<(), DispatchError> {
        if let Err(DispatchError::RateLimited { retry_after }) = self.throttle.check(Instant::now()) {
            self.sleeper.sleep(retry_after).await;
        }

        let result = self.channel.send(&self.settings.destination, text).await;
        self.throttle.record(Instant::now());

        match result {
            Err(DispatchError::RateLimited { retry_after }) => {
                let wait = retry_after.min(MAX_RESEND_WAIT);
                warn!(
                    "{} rate limited, resending in {:?}",
                    self.channel.channel_name(),
                    wait
                );
                self.sleeper.sleep(wait).await;
                let retry = self.channel.send(&self.settings.destination, text).await;
                self.throttle.record(Instant::now());
                retry
            }
            other => other,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tippzone_rust_core::models::{
        Contestant, MatchClock, MatchStatistics, MatchStatus, Period, RawSubEvent, ScorePair,
        SubEventType,
    };
    use tippzone_rust_core::FetchError;

    struct ScriptedSource {
        polls: Mutex<VecDeque<Result<Vec<MatchSnapshot>, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(polls: Vec<Result<Vec<MatchSnapshot>, FetchError>>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch_live(&self) -> Result<Vec<MatchSnapshot>, FetchError> {
            self.polls.lock().pop_front().unwrap_or_else(|| Ok(vec![]))
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct FlakyChannel {
        answers: Mutex<VecDeque<Result<(), DispatchError>>>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationChannel for FlakyChannel {
        async fn send(&self, _destination: &str, text: &str) -> Result<(), DispatchError> {
            let answer = self.answers.lock().pop_front().unwrap_or(Ok(()));
            if answer.is_ok() {
                self.sent.lock().push(text.to_string());
            }
            answer
        }

        fn channel_name(&self) -> &str {
            "flaky"
        }
    }

    #[derive(Default)]
    struct NoWait {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for NoWait {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().push(duration);
        }
    }

    fn snapshot(match_id: i64, status: &str, events: Vec<RawSubEvent>) -> MatchSnapshot {
        MatchSnapshot {
            match_id,
            league_id: Some(8),
            league_name: Some("Premier League".into()),
            starting_at: Some("2026-10-16 18:30:00".into()),
            contestants: vec![
                Contestant {
                    id: 1,
                    name: "Alpha FC".into(),
                    side: Side::Home,
                },
                Contestant {
                    id: 2,
                    name: "Beta FC".into(),
                    side: Side::Away,
                },
            ],
            score: ScorePair::default(),
            clock: MatchClock {
                minute: Some(30),
                extra_minute: None,
                period: Period::from_state_code(status),
                status: MatchStatus::new(status),
            },
            events,
            lineups: vec![],
            statistics: MatchStatistics::default(),
        }
    }

    fn yellow(id: i64, minute: u32) -> RawSubEvent {
        let mut raw = RawSubEvent::new(id, SubEventType::YellowCard, minute);
        raw.team_id = Some(1);
        raw.player_name = Some("A. Smith".into());
        raw
    }

    fn monitor(
        source: Arc<ScriptedSource>,
        channel: Arc<FlakyChannel>,
        sleeper: Arc<NoWait>,
    ) -> MonitoringLoop {
        MonitoringLoop::new(
            source,
            channel,
            Arc::new(DedupStateStore::new()),
            MonitorSettings::new("@test", [8].into_iter().collect()),
        )
        .with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty_cycle() {
        let source = Arc::new(ScriptedSource::new(vec![Err(FetchError::RateLimited)]));
        let channel = Arc::new(FlakyChannel::default());
        let mut monitor = monitor(source, channel.clone(), Arc::new(NoWait::default()));

        let report = monitor.run_cycle().await;
        assert!(report.fetch_failed);
        assert_eq!(report.fetched, 0);
        assert!(channel.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_not_retried_next_cycle() {
        let snap = snapshot(7, "INPLAY_1ST_HALF", vec![yellow(70, 12)]);
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![snap.clone()]), Ok(vec![snap])]));
        let channel = Arc::new(FlakyChannel::default());
        channel
            .answers
            .lock()
            .push_back(Err(DispatchError::Transient("connection reset".into())));
        let mut monitor = monitor(source, channel.clone(), Arc::new(NoWait::default()));

        let first = monitor.run_cycle().await;
        assert_eq!(first.new_events, 1);
        assert_eq!(first.dispatch_failures, 1);

        let second = monitor.run_cycle().await;
        assert_eq!(second.new_events, 0);
        assert!(channel.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_send_is_resent_once() {
        let snap = snapshot(7, "INPLAY_1ST_HALF", vec![yellow(70, 12)]);
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![snap])]));
        let channel = Arc::new(FlakyChannel::default());
        channel.answers.lock().push_back(Err(DispatchError::RateLimited {
            retry_after: Duration::from_secs(3),
        }));
        let sleeper = Arc::new(NoWait::default());
        let mut monitor = monitor(source, channel.clone(), sleeper.clone());

        let report = monitor.run_cycle().await;
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(channel.sent.lock().len(), 1);
        assert!(sleeper.slept.lock().contains(&Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_sends_are_spaced() {
        let snap = snapshot(7, "INPLAY_1ST_HALF", vec![yellow(70, 12), yellow(71, 14)]);
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![snap])]));
        let channel = Arc::new(FlakyChannel::default());
        let sleeper = Arc::new(NoWait::default());
        let mut monitor = monitor(source, channel.clone(), sleeper.clone());

        monitor.run_cycle().await;
        assert_eq!(channel.sent.lock().len(), 2);
        let slept = sleeper.slept.lock();
        assert_eq!(slept.len(), 1);
        assert!(slept[0] <= Duration::from_millis(500) && !slept[0].is_zero());
    }

    #[tokio::test]
    async fn test_match_without_contestants_is_skipped() {
        let mut broken = snapshot(1, "INPLAY_1ST_HALF", vec![yellow(10, 5)]);
        broken.contestants.clear();
        let good = snapshot(2, "INPLAY_1ST_HALF", vec![yellow(20, 5)]);
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![broken, good])]));
        let channel = Arc::new(FlakyChannel::default());
        let mut monitor = monitor(source, channel.clone(), Arc::new(NoWait::default()));

        let report = monitor.run_cycle().await;
        assert_eq!(report.skipped_matches, 1);
        assert_eq!(report.notifications_sent, 1);
    }

    #[tokio::test]
    async fn test_finished_match_is_not_replayed_after_cleanup() {
        let live = snapshot(9, "INPLAY_2ND_HALF", vec![yellow(90, 80)]);
        let finished = snapshot(9, "FT", vec![yellow(90, 80), yellow(91, 90)]);
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![live]),
            Ok(vec![finished.clone()]),
            Ok(vec![finished]),
        ]));
        let channel = Arc::new(FlakyChannel::default());
        let mut monitor = monitor(source, channel.clone(), Arc::new(NoWait::default()));

        monitor.run_cycle().await;
        let at_whistle = monitor.run_cycle().await;
        assert_eq!(at_whistle.new_events, 1);
        assert_eq!(at_whistle.cleaned_up, vec![9]);

        let after = monitor.run_cycle().await;
        assert_eq!(after.new_events, 0);
        assert!(!monitor.store().is_tracked(9));
        assert_eq!(channel.sent.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_match_first_seen_finished_is_notified_once() {
        let finished = snapshot(11, "FT", vec![yellow(110, 88)]);
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![finished.clone()]),
            Ok(vec![finished]),
        ]));
        let channel = Arc::new(FlakyChannel::default());
        let mut monitor = monitor(source, channel.clone(), Arc::new(NoWait::default()));

        let first = monitor.run_cycle().await;
        assert_eq!(first.notifications_sent, 1);
        assert_eq!(first.cleaned_up, vec![11]);
        assert!(monitor.store().is_finished(11));

        let second = monitor.run_cycle().await;
        assert_eq!(second.new_events, 0);
        assert_eq!(channel.sent.lock().len(), 1);
    }

    struct PanicSource;

    #[async_trait]
    impl SnapshotSource for PanicSource {
        async fn fetch_live(&self) -> Result<Vec<MatchSnapshot>, FetchError> {
            panic!("provider state corrupted")
        }

        fn provider_name(&self) -> &str {
            "panicking"
        }
    }

    /// Records the requested delay, then signals shutdown instead of waiting
    struct StopAfterSleep {
        slept: Mutex<Vec<Duration>>,
        stop: watch::Sender<bool>,
    }

    #[async_trait]
    impl Sleeper for StopAfterSleep {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().push(duration);
            let _ = self.stop.send(true);
        }
    }

    /// Records the requested delay and never wakes up
    #[derive(Default)]
    struct Forever {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for Forever {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().push(duration);
            std::future::pending::<()>().await;
        }
    }

    /// Signals shutdown on its first fetch and reports no matches
    struct StopOnFetch {
        stop: watch::Sender<bool>,
        fetches: Mutex<usize>,
    }

    #[async_trait]
    impl SnapshotSource for StopOnFetch {
        async fn fetch_live(&self) -> Result<Vec<MatchSnapshot>, FetchError> {
            *self.fetches.lock() += 1;
            let _ = self.stop.send(true);
            Ok(vec![])
        }

        fn provider_name(&self) -> &str {
            "stop-on-fetch"
        }
    }

    fn loop_with(source: Arc<dyn SnapshotSource>, sleeper: Arc<dyn Sleeper>) -> MonitoringLoop {
        MonitoringLoop::new(
            source,
            Arc::new(FlakyChannel::default()),
            Arc::new(DedupStateStore::new()),
            MonitorSettings::new("@test", [8].into_iter().collect()),
        )
        .with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_cycle_panic_waits_recovery_delay() {
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(StopAfterSleep {
            slept: Mutex::new(Vec::new()),
            stop: tx,
        });
        let mut monitor = loop_with(Arc::new(PanicSource), sleeper.clone());

        monitor.run(rx).await;
        assert_eq!(monitor.state(), LoopState::Stopped);
        assert_eq!(
            *sleeper.slept.lock(),
            vec![Duration::from_secs(DEFAULT_ERROR_RECOVERY_DELAY_SECS)]
        );
    }

    #[tokio::test]
    async fn test_guarded_cycle_reports_panic() {
        let mut monitor = loop_with(Arc::new(PanicSource), Arc::new(Forever::default()));
        match monitor.run_guarded_cycle().await {
            Err(CycleError::Panicked(msg)) => assert_eq!(msg, "provider state corrupted"),
            other => panic!("expected a panicked cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_normal_cycle_sleeps_at_most_poll_interval() {
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(StopAfterSleep {
            slept: Mutex::new(Vec::new()),
            stop: tx,
        });
        let source = Arc::new(ScriptedSource::new(vec![]));
        let mut monitor = loop_with(source, sleeper.clone());

        monitor.run(rx).await;
        let slept = sleeper.slept.lock();
        assert_eq!(slept.len(), 1);
        assert!(!slept[0].is_zero());
        assert!(slept[0] <= Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
    }

    #[tokio::test]
    async fn test_zero_poll_interval_never_sleeps() {
        let (tx, rx) = watch::channel(false);
        let source = Arc::new(StopOnFetch {
            stop: tx,
            fetches: Mutex::new(0),
        });
        let sleeper = Arc::new(Forever::default());
        let mut settings = MonitorSettings::new("@test", [8].into_iter().collect());
        settings.poll_interval = Duration::ZERO;
        let mut monitor = MonitoringLoop::new(
            source.clone(),
            Arc::new(FlakyChannel::default()),
            Arc::new(DedupStateStore::new()),
            settings,
        )
        .with_sleeper(sleeper.clone());

        monitor.run(rx).await;
        assert_eq!(*source.fetches.lock(), 1);
        assert!(sleeper.slept.lock().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(Forever::default());
        let mut monitor = loop_with(Arc::new(ScriptedSource::new(vec![])), sleeper.clone());

        let signal = async {
            while sleeper.slept.lock().is_empty() {
                tokio::task::yield_now().await;
            }
            tx.send(true).expect("monitor holds the receiver");
        };
        let stopped = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(monitor.run(rx), signal);
        })
        .await;

        assert!(stopped.is_ok(), "run did not stop while sleeping");
        assert_eq!(monitor.state(), LoopState::Stopped);
        assert_eq!(sleeper.slept.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let channel = Arc::new(FlakyChannel::default());
        let mut monitor = monitor(source, channel, Arc::new(NoWait::default()));

        let (tx, rx) = watch::channel(true);
        monitor.run(rx).await;
        assert_eq!(monitor.state(), LoopState::Stopped);
        drop(tx);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad state"));
        assert_eq!(panic_message(payload.as_ref()), "bad state");
    }
}
