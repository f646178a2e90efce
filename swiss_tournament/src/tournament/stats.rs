//! Win/loss aggregation applied when a tournament completes.

use super::models::Tournament;
use crate::matches::models::MatchStatus;
use crate::player::models::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wins and losses a player earned in one tournament
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDelta {
    pub wins: i32,
    pub losses: i32,
}

impl RecordDelta {
    pub fn is_zero(&self) -> bool {
        self.wins == 0 && self.losses == 0
    }
}

/// Count each enrolled player's wins and losses over the completed matches
///
/// A bye is a win without a counterpart loss. Draws and matches that are not
/// COMPLETED count nothing. Every enrolled player gets an entry, possibly zero.
pub fn aggregate(tournament: &Tournament) -> BTreeMap<PlayerId, RecordDelta> {
    let mut deltas: BTreeMap<PlayerId, RecordDelta> = tournament
        .player_ids()
        .map(|id| (id, RecordDelta::default()))
        .collect();

    for m in tournament
        .matches()
        .filter(|m| m.status == MatchStatus::Completed)
    {
        if let Some(delta) = m.winner.and_then(|w| deltas.get_mut(&w)) {
            delta.wins += 1;
        }
        if let Some(delta) = m.loser().and_then(|l| deltas.get_mut(&l)) {
            delta.losses += 1;
        }
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::models::{Match, NewMatch};
    use crate::tournament::models::{Enrollment, Round, TournamentStatus};

    fn completed(id: i64, p1: PlayerId, p2: PlayerId, s1: i32, s2: i32) -> Match {
        let mut m = NewMatch::pairing(p1, p2).into_match(id, 1);
        m.record_result(s1, s2);
        m
    }

    fn tournament(players: &[PlayerId], matches: Vec<Match>) -> Tournament {
        Tournament {
            id: 1,
            name: "Open".to_string(),
            start_date: None,
            end_date: None,
            status: TournamentStatus::InProgress,
            enrollments: players.iter().map(|&id| Enrollment::new(id)).collect(),
            rounds: vec![Round {
                id: 1,
                tournament_id: 1,
                round_number: 1,
                completed: true,
                matches,
            }],
        }
    }

    #[test]
    fn test_win_and_loss_counted() {
        let t = tournament(&[1, 2], vec![completed(1, 1, 2, 3, 1)]);
        let deltas = aggregate(&t);
        assert_eq!(deltas[&1], RecordDelta { wins: 1, losses: 0 });
        assert_eq!(deltas[&2], RecordDelta { wins: 0, losses: 1 });
    }

    #[test]
    fn test_bye_and_draw() {
        let t = tournament(
            &[1, 2, 3],
            vec![completed(1, 1, 2, 2, 2), NewMatch::bye(3).into_match(2, 1)],
        );
        let deltas = aggregate(&t);
        assert!(deltas[&1].is_zero());
        assert!(deltas[&2].is_zero());
        assert_eq!(deltas[&3], RecordDelta { wins: 1, losses: 0 });
    }

    #[test]
    fn test_withdrawn_players_are_ignored() {
        // Player 2 played but is no longer enrolled
        let t = tournament(&[1], vec![completed(1, 1, 2, 0, 4)]);
        let deltas = aggregate(&t);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[&1], RecordDelta { wins: 0, losses: 1 });
    }

    #[test]
    fn test_unfinished_matches_count_nothing() {
        let mut cancelled = NewMatch::pairing(1, 2).into_match(1, 1);
        cancelled.status = MatchStatus::Cancelled;
        let t = tournament(&[1, 2], vec![cancelled]);
        assert!(aggregate(&t).values().all(RecordDelta::is_zero));
    }
}
