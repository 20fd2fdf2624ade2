// Shared models for the live match notifier
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// Sides & Contestants
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    /// Parse a provider location tag (`home` / `away`, any case)
    pub fn from_location(tag: &str) -> Option<Side> {
        match tag.trim().to_lowercase().as_str() {
            "home" => Some(Side::Home),
            "away" => Some(Side::Away),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contestant {
    pub id: i64,
    pub name: String,
    pub side: Side,
}

/// Goals per side. Both tallies start at zero and never go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScorePair {
    pub home: u32,
    pub away: u32,
}

impl ScorePair {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn credit(&mut self, side: Side) {
        match side {
            Side::Home => self.home += 1,
            Side::Away => self.away += 1,
        }
    }
}

impl std::fmt::Display for ScorePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

// ============================================================================
// Match Clock & Status
// ============================================================================

/// Period tag of the match clock, derived from the provider state code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    Penalties,
    Finished,
    Unknown,
}

impl Period {
    pub fn from_state_code(code: &str) -> Period {
        match code.trim().to_uppercase().as_str() {
            "NS" | "TBA" | "DELAYED" => Period::NotStarted,
            "INPLAY_1ST_HALF" | "1ST_HALF" => Period::FirstHalf,
            "HT" | "BREAK" => Period::HalfTime,
            "INPLAY_2ND_HALF" | "2ND_HALF" => Period::SecondHalf,
            "INPLAY_ET" | "INPLAY_ET_2ND_HALF" | "EXTRA_TIME_BREAK" | "ET" => Period::ExtraTime,
            "INPLAY_PENALTIES" | "PEN_BREAK" | "PENALTIES" => Period::Penalties,
            "FT" | "AET" | "FT_PEN" | "ENDED" => Period::Finished,
            _ => Period::Unknown,
        }
    }
}

/// Provider status code, kept verbatim (`INPLAY_2ND_HALF`, `FT`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus(pub String);

impl MatchStatus {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Play has permanently ended: full time, after extra time, after
    /// penalties, or an explicit "ended" marker.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.0.trim().to_uppercase().as_str(),
            "FT" | "AET" | "FT_PEN" | "ENDED" | "FINISHED"
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchClock {
    pub minute: Option<u32>,
    pub extra_minute: Option<u32>,
    pub period: Period,
    pub status: MatchStatus,
}

// ============================================================================
// Raw Sub-Events
// ============================================================================

/// Provider event type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubEventType {
    Goal,
    OwnGoal,
    PenaltyGoal,
    YellowCard,
    RedCard,
    SecondYellow,
    Other(i64),
}

impl SubEventType {
    pub fn from_code(code: i64) -> Self {
        match code {
            14 => SubEventType::Goal,
            15 => SubEventType::OwnGoal,
            16 => SubEventType::PenaltyGoal,
            19 => SubEventType::YellowCard,
            20 => SubEventType::RedCard,
            21 => SubEventType::SecondYellow,
            other => SubEventType::Other(other),
        }
    }

    pub fn is_goal(&self) -> bool {
        matches!(
            self,
            SubEventType::Goal | SubEventType::OwnGoal | SubEventType::PenaltyGoal
        )
    }
}

/// One entry in a snapshot's event collection. Every hint is optional;
/// the provider fills them inconsistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSubEvent {
    pub id: i64,
    pub event_type: SubEventType,
    pub minute: u32,
    pub extra_minute: Option<u32>,
    /// Outcome/result tag, used to detect voided entries
    pub result: Option<String>,
    pub rescinded: bool,
    /// Provider section (`event`, `shootout`, ...)
    pub section: Option<String>,
    pub team_id: Option<i64>,
    pub participant_id: Option<i64>,
    pub location: Option<String>,
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub team_name: Option<String>,
}

impl RawSubEvent {
    /// Bare event with no identification hints
    pub fn new(id: i64, event_type: SubEventType, minute: u32) -> Self {
        Self {
            id,
            event_type,
            minute,
            extra_minute: None,
            result: None,
            rescinded: false,
            section: None,
            team_id: None,
            participant_id: None,
            location: None,
            player_id: None,
            player_name: None,
            team_name: None,
        }
    }

    pub fn ordering_key(&self) -> OrderingKey {
        OrderingKey::new(self.minute, self.extra_minute, self.id)
    }
}

/// Lineup/roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupEntry {
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub team_id: i64,
}

/// Per-side counters the summary tracks between polls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStats {
    pub shots: u32,
    pub shots_on_target: u32,
    pub corners: u32,
    pub yellow_cards: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub home: SideStats,
    pub away: SideStats,
}

// ============================================================================
// Match Snapshot
// ============================================================================

/// One fetched state of a live match. Rebuilt every poll and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: i64,
    pub league_id: Option<i64>,
    pub league_name: Option<String>,
    pub starting_at: Option<String>,
    pub contestants: Vec<Contestant>,
    pub score: ScorePair,
    pub clock: MatchClock,
    pub events: Vec<RawSubEvent>,
    pub lineups: Vec<LineupEntry>,
    pub statistics: MatchStatistics,
}

impl MatchSnapshot {
    pub fn contestant(&self, side: Side) -> Option<&Contestant> {
        self.contestants.iter().find(|c| c.side == side)
    }

    pub fn contestant_by_id(&self, id: i64) -> Option<&Contestant> {
        self.contestants.iter().find(|c| c.id == id)
    }

    /// Side whose display name equals `name` (case-insensitive)
    pub fn side_for_name(&self, name: &str) -> Option<Side> {
        let needle = name.trim().to_lowercase();
        self.contestants
            .iter()
            .find(|c| c.name.trim().to_lowercase() == needle)
            .map(|c| c.side)
    }

    pub fn is_terminal(&self) -> bool {
        self.clock.status.is_terminal()
    }
}

// ============================================================================
// Canonical Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Regular,
    Penalty,
    OwnGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Yellow,
    Red,
    SecondYellow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Goal(GoalKind),
    Card(CardKind),
}

impl EventCategory {
    pub fn is_goal(&self) -> bool {
        matches!(self, EventCategory::Goal(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Goal(_) => "goal",
            EventCategory::Card(_) => "card",
        }
    }
}

/// Timeline phase an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    FirstHalf,
    SecondHalf,
    ExtraTime,
    Shootout,
}

impl MatchPhase {
    /// Phase from the minute counter; the shoot-out only shows up as a section tag.
    pub fn classify(minute: u32, section: Option<&str>) -> MatchPhase {
        let shootout = section
            .map(|s| {
                let s = s.to_lowercase();
                s.contains("shootout") || s.contains("penalties")
            })
            .unwrap_or(false);
        if shootout {
            MatchPhase::Shootout
        } else if minute <= 45 {
            MatchPhase::FirstHalf
        } else if minute <= 90 {
            MatchPhase::SecondHalf
        } else {
            MatchPhase::ExtraTime
        }
    }
}

/// Which attribution tier resolved the team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionSource {
    TeamId,
    PlayerLineup,
    Location,
    PlayerName,
    TeamNameHint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TeamAttribution {
    Resolved {
        /// `None` when only a display name was recovered and it matches neither contestant
        side: Option<Side>,
        name: String,
        source: AttributionSource,
    },
    Unresolved,
}

impl TeamAttribution {
    pub fn side(&self) -> Option<Side> {
        match self {
            TeamAttribution::Resolved { side, .. } => *side,
            TeamAttribution::Unresolved => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TeamAttribution::Resolved { name, .. } => Some(name.as_str()),
            TeamAttribution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TeamAttribution::Resolved { .. })
    }
}

/// Total order over a match timeline: minute, then stoppage minute, then id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderingKey {
    pub minute: u32,
    pub extra_minute: u32,
    pub id: i64,
}

impl OrderingKey {
    pub fn new(minute: u32, extra_minute: Option<u32>, id: i64) -> Self {
        Self {
            minute,
            extra_minute: extra_minute.unwrap_or(0),
            id,
        }
    }
}

/// Sub-event after validity filtering and team attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub id: i64,
    pub category: EventCategory,
    pub minute: u32,
    pub extra_minute: Option<u32>,
    pub phase: MatchPhase,
    pub player_name: Option<String>,
    pub team: TeamAttribution,
}

impl CanonicalEvent {
    pub fn ordering_key(&self) -> OrderingKey {
        OrderingKey::new(self.minute, self.extra_minute, self.id)
    }

    /// Side credited with the goal; own goals count for the opposite side.
    /// `None` for cards and for goals whose side could not be resolved.
    pub fn credited_side(&self) -> Option<Side> {
        match self.category {
            EventCategory::Goal(GoalKind::OwnGoal) => self.team.side().map(Side::opposite),
            EventCategory::Goal(_) => self.team.side(),
            EventCategory::Card(_) => None,
        }
    }
}

impl PartialOrd for CanonicalEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }
}

// ============================================================================
// Match summary (last-known state per match)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub score: ScorePair,
    pub statistics: MatchStatistics,
    pub period: Period,
    pub status: MatchStatus,
    pub recorded_at: DateTime<Utc>,
}

impl MatchSummary {
    pub fn from_snapshot(snapshot: &MatchSnapshot) -> Self {
        Self {
            score: snapshot.score,
            statistics: snapshot.statistics,
            period: snapshot.clock.period,
            status: snapshot.clock.status.clone(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_key_orders_stoppage_before_next_minute() {
        let a = OrderingKey::new(45, Some(2), 900);
        let b = OrderingKey::new(46, None, 1);
        let c = OrderingKey::new(45, None, 999);
        assert!(c < a);
        assert!(a < b);
    }

    #[test]
    fn test_ordering_key_breaks_ties_by_id() {
        assert!(OrderingKey::new(10, None, 1) < OrderingKey::new(10, None, 2));
        assert_eq!(OrderingKey::new(10, None, 7), OrderingKey::new(10, Some(0), 7));
    }

    #[test]
    fn test_terminal_statuses() {
        for code in ["FT", "AET", "FT_PEN", "ended", "Ended"] {
            assert!(MatchStatus::new(code).is_terminal(), "{code}");
        }
        for code in ["INPLAY_1ST_HALF", "HT", "INPLAY_PENALTIES", "NS"] {
            assert!(!MatchStatus::new(code).is_terminal(), "{code}");
        }
    }

    #[test]
    fn test_sub_event_type_codes() {
        assert_eq!(SubEventType::from_code(14), SubEventType::Goal);
        assert_eq!(SubEventType::from_code(15), SubEventType::OwnGoal);
        assert_eq!(SubEventType::from_code(21), SubEventType::SecondYellow);
        assert_eq!(SubEventType::from_code(18), SubEventType::Other(18));
        assert!(SubEventType::PenaltyGoal.is_goal());
        assert!(!SubEventType::RedCard.is_goal());
    }

    #[test]
    fn test_phase_classification() {
        assert_eq!(MatchPhase::classify(45, None), MatchPhase::FirstHalf);
        assert_eq!(MatchPhase::classify(46, None), MatchPhase::SecondHalf);
        assert_eq!(MatchPhase::classify(90, None), MatchPhase::SecondHalf);
        assert_eq!(MatchPhase::classify(105, None), MatchPhase::ExtraTime);
        assert_eq!(MatchPhase::classify(120, Some("shootout")), MatchPhase::Shootout);
    }

    #[test]
    fn test_own_goal_credits_opposite_side() {
        let event = CanonicalEvent {
            id: 1,
            category: EventCategory::Goal(GoalKind::OwnGoal),
            minute: 30,
            extra_minute: None,
            phase: MatchPhase::FirstHalf,
            player_name: None,
            team: TeamAttribution::Resolved {
                side: Some(Side::Home),
                name: "Alpha FC".to_string(),
                source: AttributionSource::TeamId,
            },
        };
        assert_eq!(event.credited_side(), Some(Side::Away));
    }
}
