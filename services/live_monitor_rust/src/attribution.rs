//! Raw sub-events → canonical, team-attributed events
//!
//! Team attribution is an ordered list of strategies. Each strategy is a pure
//! function over the raw event and the match context; the first one that
//! returns a team wins.

use crate::teams::TeamMapping;
use std::collections::HashSet;
use tippzone_rust_core::models::{
    AttributionSource, CanonicalEvent, CardKind, EventCategory, GoalKind, MatchPhase,
    MatchSnapshot, RawSubEvent, Side, SubEventType, TeamAttribution,
};
use tracing::warn;

/// Outcome tags that mark an entry as void
const VOID_MARKERS: [&str; 3] = ["cancelled", "disallowed", "void"];

pub struct AttributionContext<'a> {
    pub snapshot: &'a MatchSnapshot,
    pub mapping: &'a TeamMapping,
}

/// A team found by one strategy. `side` is `None` when only a display name
/// was recovered and it matches neither contestant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMatch {
    pub side: Option<Side>,
    pub name: String,
}

pub type AttributionStrategy = fn(&RawSubEvent, &AttributionContext<'_>) -> Option<TeamMatch>;

/// Tried in order, first success wins
pub const STRATEGIES: [(AttributionSource, AttributionStrategy); 5] = [
    (AttributionSource::TeamId, by_team_id),
    (AttributionSource::PlayerLineup, by_player_lineup),
    (AttributionSource::Location, by_location),
    (AttributionSource::PlayerName, by_player_name),
    (AttributionSource::TeamNameHint, by_team_name_hint),
];

fn contestant_match(snapshot: &MatchSnapshot, team_id: i64) -> Option<TeamMatch> {
    snapshot.contestant_by_id(team_id).map(|c| TeamMatch {
        side: Some(c.side),
        name: c.name.clone(),
    })
}

/// Tier 1: team id, then participant id, against the two contestants
pub fn by_team_id(raw: &RawSubEvent, ctx: &AttributionContext<'_>) -> Option<TeamMatch> {
    [raw.team_id, raw.participant_id]
        .into_iter()
        .flatten()
        .find_map(|id| contestant_match(ctx.snapshot, id))
}

/// Tier 2: player id → lineup team id → contestant
pub fn by_player_lineup(raw: &RawSubEvent, ctx: &AttributionContext<'_>) -> Option<TeamMatch> {
    let team_id = ctx.mapping.team_for_player_id(raw.player_id?)?;
    contestant_match(ctx.snapshot, team_id)
}

/// Tier 3: `home` / `away` location tag
pub fn by_location(raw: &RawSubEvent, ctx: &AttributionContext<'_>) -> Option<TeamMatch> {
    let side = Side::from_location(raw.location.as_deref()?)?;
    ctx.snapshot.contestant(side).map(|c| TeamMatch {
        side: Some(side),
        name: c.name.clone(),
    })
}

/// Tier 4: player display name → lineup team name
pub fn by_player_name(raw: &RawSubEvent, ctx: &AttributionContext<'_>) -> Option<TeamMatch> {
    let name = ctx.mapping.team_name_for_player(raw.player_name.as_deref()?)?;
    Some(TeamMatch {
        side: ctx.snapshot.side_for_name(name),
        name: name.to_string(),
    })
}

/// Tier 5: free-text team name on the event itself
pub fn by_team_name_hint(raw: &RawSubEvent, ctx: &AttributionContext<'_>) -> Option<TeamMatch> {
    let hint = raw.team_name.as_deref()?.trim();
    if hint.is_empty() {
        return None;
    }
    let side = ctx.snapshot.side_for_name(hint);
    let name = side
        .and_then(|s| ctx.snapshot.contestant(s))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| hint.to_string());
    Some(TeamMatch { side, name })
}

pub fn attribute(raw: &RawSubEvent, ctx: &AttributionContext<'_>) -> TeamAttribution {
    for (source, strategy) in STRATEGIES.iter() {
        if let Some(found) = strategy(raw, ctx) {
            return TeamAttribution::Resolved {
                side: found.side,
                name: found.name,
                source: *source,
            };
        }
    }
    TeamAttribution::Unresolved
}

/// Voided entries: an outcome tag containing one of the void markers as a
/// whole word ("Goal Disallowed", "VAR: cancelled"), or an explicit rescind flag.
pub fn is_void(raw: &RawSubEvent) -> bool {
    if raw.rescinded {
        return true;
    }
    let Some(result) = raw.result.as_deref() else {
        return false;
    };
    let lowered = result.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| VOID_MARKERS.contains(&word))
}

pub fn classify(event_type: SubEventType) -> Option<EventCategory> {
    match event_type {
        SubEventType::Goal => Some(EventCategory::Goal(GoalKind::Regular)),
        SubEventType::PenaltyGoal => Some(EventCategory::Goal(GoalKind::Penalty)),
        SubEventType::OwnGoal => Some(EventCategory::Goal(GoalKind::OwnGoal)),
        SubEventType::YellowCard => Some(EventCategory::Card(CardKind::Yellow)),
        SubEventType::RedCard => Some(EventCategory::Card(CardKind::Red)),
        SubEventType::SecondYellow => Some(EventCategory::Card(CardKind::SecondYellow)),
        SubEventType::Other(_) => None,
    }
}

/// Canonical goal and card events of the snapshot, ascending by
/// `(minute, extra_minute, id)` whatever the source order. A sub-event id
/// listed twice is emitted once.
pub fn extract(snapshot: &MatchSnapshot, mapping: &TeamMapping) -> Vec<CanonicalEvent> {
    let ctx = AttributionContext { snapshot, mapping };

    let mut raws: Vec<&RawSubEvent> = snapshot
        .events
        .iter()
        .filter(|raw| !is_void(raw))
        .collect();
    raws.sort_by_key(|raw| raw.ordering_key());

    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(raws.len());

    for raw in raws {
        let Some(category) = classify(raw.event_type) else {
            continue;
        };
        if !seen.insert(raw.id) {
            continue;
        }

        let team = attribute(raw, &ctx);
        if !team.is_resolved() {
            warn!(
                "Unresolved team for {} event {} in match {} ({}') team_id={:?} participant_id={:?} location={:?} player_id={:?} player={:?}",
                category.as_str(),
                raw.id,
                snapshot.match_id,
                raw.minute,
                raw.team_id,
                raw.participant_id,
                raw.location,
                raw.player_id,
                raw.player_name,
            );
        }

        events.push(CanonicalEvent {
            id: raw.id,
            category,
            minute: raw.minute,
            extra_minute: raw.extra_minute.filter(|x| *x > 0),
            phase: MatchPhase::classify(raw.minute, raw.section.as_deref()),
            player_name: raw
                .player_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            team,
        });
    }

    events
}
