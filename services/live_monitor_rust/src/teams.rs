//! Player → team lookup tables built from lineup data

use std::collections::HashMap;
use tippzone_rust_core::models::MatchSnapshot;

/// Per-snapshot lookup tables. Rebuilt every poll; empty tables are normal
/// when the provider sends no lineups.
#[derive(Debug, Clone, Default)]
pub struct TeamMapping {
    team_name_by_player: HashMap<String, String>,
    team_id_by_player_id: HashMap<i64, i64>,
}

impl TeamMapping {
    /// Single pass over the lineup. Names are only recorded for entries whose
    /// team is one of the two contestants.
    pub fn build(snapshot: &MatchSnapshot) -> Self {
        let mut mapping = TeamMapping::default();

        for entry in &snapshot.lineups {
            if let Some(player_id) = entry.player_id {
                mapping.team_id_by_player_id.insert(player_id, entry.team_id);
            }

            let Some(contestant) = snapshot.contestant_by_id(entry.team_id) else {
                continue;
            };
            if let Some(name) = entry.player_name.as_deref() {
                let key = normalize(name);
                if !key.is_empty() {
                    mapping
                        .team_name_by_player
                        .insert(key, contestant.name.clone());
                }
            }
        }

        mapping
    }

    pub fn team_for_player_id(&self, player_id: i64) -> Option<i64> {
        self.team_id_by_player_id.get(&player_id).copied()
    }

    pub fn team_name_for_player(&self, player_name: &str) -> Option<&str> {
        self.team_name_by_player
            .get(&normalize(player_name))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.team_name_by_player.is_empty() && self.team_id_by_player_id.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tippzone_rust_core::models::{
        Contestant, LineupEntry, MatchClock, MatchStatistics, MatchStatus, Period, ScorePair, Side,
    };

    fn snapshot(lineups: Vec<LineupEntry>) -> MatchSnapshot {
        MatchSnapshot {
            match_id: 1,
            league_id: Some(8),
            league_name: None,
            starting_at: None,
            contestants: vec![
                Contestant { id: 10, name: "Alpha FC".into(), side: Side::Home },
                Contestant { id: 20, name: "Beta FC".into(), side: Side::Away },
            ],
            score: ScorePair::default(),
            clock: MatchClock {
                minute: Some(10),
                extra_minute: None,
                period: Period::FirstHalf,
                status: MatchStatus::new("INPLAY_1ST_HALF"),
            },
            events: vec![],
            lineups,
            statistics: MatchStatistics::default(),
        }
    }

    fn entry(player_id: Option<i64>, name: Option<&str>, team_id: i64) -> LineupEntry {
        LineupEntry {
            player_id,
            player_name: name.map(str::to_string),
            team_id,
        }
    }

    #[test]
    fn test_build_maps_names_and_ids() {
        let mapping = TeamMapping::build(&snapshot(vec![
            entry(Some(7), Some("J. Doe"), 20),
            entry(Some(8), Some("A. Smith"), 10),
        ]));
        assert_eq!(mapping.team_for_player_id(7), Some(20));
        assert_eq!(mapping.team_name_for_player("j. doe "), Some("Beta FC"));
        assert_eq!(mapping.team_name_for_player("A. Smith"), Some("Alpha FC"));
    }

    #[test]
    fn test_unknown_team_is_not_named() {
        let mapping = TeamMapping::build(&snapshot(vec![entry(Some(9), Some("Loaner"), 99)]));
        assert_eq!(mapping.team_name_for_player("Loaner"), None);
        assert_eq!(mapping.team_for_player_id(9), Some(99));
    }

    #[test]
    fn test_empty_lineup() {
        assert!(TeamMapping::build(&snapshot(vec![])).is_empty());
    }
}
