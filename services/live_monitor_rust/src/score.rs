//! Score reconstruction at a point of the match timeline
//!
//! The headline score is the current total. A notification that arrives late
//! still has to show the score at the moment of its event, so the tally is
//! rebuilt from the goal events up to and including the target.

use crate::attribution;
use crate::teams::TeamMapping;
use tippzone_rust_core::models::{
    CanonicalEvent, MatchPhase, MatchSnapshot, OrderingKey, ScorePair,
};

pub fn score_as_of(
    snapshot: &MatchSnapshot,
    mapping: &TeamMapping,
    target: &CanonicalEvent,
) -> ScorePair {
    let events = attribution::extract(snapshot, mapping);
    tally_until(&events, target.ordering_key())
}

/// Goals with an ordering key `<= until`. Own goals count for the opposite
/// side; a goal with no resolved side counts for nobody. Shoot-out kicks are
/// not goals of the match.
pub fn tally_until(events: &[CanonicalEvent], until: OrderingKey) -> ScorePair {
    let mut goals: Vec<&CanonicalEvent> = events
        .iter()
        .filter(|e| e.category.is_goal() && e.phase != MatchPhase::Shootout)
        .collect();
    goals.sort_by_key(|e| e.ordering_key());

    let mut score = ScorePair::default();
    for goal in goals {
        if goal.ordering_key() > until {
            break;
        }
        if let Some(side) = goal.credited_side() {
            score.credit(side);
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use tippzone_rust_core::models::{
        AttributionSource, CardKind, EventCategory, GoalKind, Side, TeamAttribution,
    };

    fn event(id: i64, minute: u32, extra: Option<u32>, kind: GoalKind, side: Option<Side>) -> CanonicalEvent {
        CanonicalEvent {
            id,
            category: EventCategory::Goal(kind),
            minute,
            extra_minute: extra,
            phase: MatchPhase::classify(minute, None),
            player_name: None,
            team: match side {
                Some(side) => TeamAttribution::Resolved {
                    side: Some(side),
                    name: side.as_str().to_string(),
                    source: AttributionSource::TeamId,
                },
                None => TeamAttribution::Unresolved,
            },
        }
    }

    #[test]
    fn test_stoppage_goal_excludes_later_goals() {
        let events = vec![
            event(1, 12, None, GoalKind::Regular, Some(Side::Home)),
            event(2, 45, Some(2), GoalKind::Regular, Some(Side::Away)),
            event(3, 67, None, GoalKind::Regular, Some(Side::Home)),
        ];
        let score = tally_until(&events, events[1].ordering_key());
        assert_eq!(score, ScorePair::new(1, 1));
    }

    #[test]
    fn test_target_is_included() {
        let events = vec![event(1, 12, None, GoalKind::Regular, Some(Side::Home))];
        assert_eq!(tally_until(&events, events[0].ordering_key()), ScorePair::new(1, 0));
    }

    #[test]
    fn test_same_minute_breaks_tie_by_id() {
        let events = vec![
            event(8, 30, None, GoalKind::Regular, Some(Side::Home)),
            event(5, 30, None, GoalKind::Regular, Some(Side::Away)),
        ];
        assert_eq!(tally_until(&events, events[1].ordering_key()), ScorePair::new(0, 1));
        assert_eq!(tally_until(&events, events[0].ordering_key()), ScorePair::new(1, 1));
    }

    #[test]
    fn test_own_goal_credits_other_side() {
        let events = vec![event(1, 20, None, GoalKind::OwnGoal, Some(Side::Home))];
        assert_eq!(tally_until(&events, events[0].ordering_key()), ScorePair::new(0, 1));
    }

    #[test]
    fn test_unresolved_goal_counts_for_nobody() {
        let events = vec![
            event(1, 20, None, GoalKind::Regular, None),
            event(2, 25, None, GoalKind::Penalty, Some(Side::Away)),
        ];
        assert_eq!(tally_until(&events, events[1].ordering_key()), ScorePair::new(0, 1));
    }

    #[test]
    fn test_cards_are_ignored() {
        let mut card = event(1, 10, None, GoalKind::Regular, Some(Side::Home));
        card.category = EventCategory::Card(CardKind::Yellow);
        let events = vec![card, event(2, 15, None, GoalKind::Regular, Some(Side::Away))];
        assert_eq!(tally_until(&events, events[1].ordering_key()), ScorePair::new(0, 1));
    }

    #[test]
    fn test_shootout_kicks_do_not_change_the_score() {
        let mut kick = event(3, 120, None, GoalKind::Penalty, Some(Side::Home));
        kick.phase = MatchPhase::classify(120, Some("shootout"));
        let events = vec![
            event(1, 30, None, GoalKind::Regular, Some(Side::Home)),
            event(2, 80, None, GoalKind::Regular, Some(Side::Away)),
            kick,
        ];
        assert_eq!(tally_until(&events, events[2].ordering_key()), ScorePair::new(1, 1));
    }
}
