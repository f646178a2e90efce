//! Tournament and round data models.

use crate::matches::models::{Match, MatchStatus, NewMatch};
use crate::player::models::PlayerId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// Round ID type
pub type RoundId = i64;

/// Tournament state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Accepting enrollments, no play yet
    Created,
    /// Rounds being played
    InProgress,
    /// All rounds finished, statistics applied
    Completed,
    /// Called off
    Cancelled,
}

impl TournamentStatus {
    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Created => "CREATED",
            TournamentStatus::InProgress => "IN_PROGRESS",
            TournamentStatus::Completed => "COMPLETED",
            TournamentStatus::Cancelled => "CANCELLED",
        }
    }

    /// No transition leaves a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(TournamentStatus::Created),
            "IN_PROGRESS" => Ok(TournamentStatus::InProgress),
            "COMPLETED" => Ok(TournamentStatus::Completed),
            "CANCELLED" => Ok(TournamentStatus::Cancelled),
            other => Err(format!("unknown tournament status '{other}'")),
        }
    }
}

/// A player's membership in a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub player_id: PlayerId,
    /// Per-tournament standing, 0 until assigned
    pub ranking: i32,
}

impl Enrollment {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            ranking: 0,
        }
    }
}

/// A tournament with its enrollments (in enrollment order) and rounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: TournamentStatus,
    pub enrollments: Vec<Enrollment>,
    pub rounds: Vec<Round>,
}

impl Tournament {
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.enrollments.iter().map(|e| e.player_id)
    }

    pub fn player_count(&self) -> usize {
        self.enrollments.len()
    }

    pub fn is_enrolled(&self, player_id: PlayerId) -> bool {
        self.enrollments.iter().any(|e| e.player_id == player_id)
    }

    pub fn ranking_of(&self, player_id: PlayerId) -> Option<i32> {
        self.enrollments
            .iter()
            .find(|e| e.player_id == player_id)
            .map(|e| e.ranking)
    }

    /// Earliest round that has not been completed yet
    pub fn first_open_round(&self) -> Option<&Round> {
        self.rounds.iter().find(|r| !r.completed)
    }

    pub fn next_round_number(&self) -> i32 {
        self.rounds.len() as i32 + 1
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.rounds.iter().flat_map(|r| r.matches.iter())
    }
}

/// Input for creating a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub player_ids: Vec<PlayerId>,
}

impl NewTournament {
    pub fn new(
        name: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        player_ids: Vec<PlayerId>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            start_date,
            end_date,
            player_ids,
        }
    }
}

/// One round of a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    /// 1-based, unique within the tournament
    pub round_number: i32,
    pub completed: bool,
    pub matches: Vec<Match>,
}

impl Round {
    /// Vacuously true for an empty round
    pub fn all_matches_completed(&self) -> bool {
        self.matches
            .iter()
            .all(|m| m.status == MatchStatus::Completed)
    }

    pub fn pending_match_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.status != MatchStatus::Completed)
            .count()
    }
}

/// A round produced by the pairing engine, before it has an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRound {
    pub round_number: i32,
    pub matches: Vec<NewMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(completed: bool, statuses: &[MatchStatus]) -> Round {
        Round {
            id: 1,
            tournament_id: 1,
            round_number: 1,
            completed,
            matches: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| Match {
                    id: i as i64 + 1,
                    round_id: 1,
                    player1: 1,
                    player2: Some(2),
                    winner: None,
                    score_player1: 0,
                    score_player2: 0,
                    status: *status,
                })
                .collect(),
        }
    }

    #[test]
    fn test_status_string_mapping() {
        for status in [
            TournamentStatus::Created,
            TournamentStatus::InProgress,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TournamentStatus>(), Ok(status));
        }
        assert!("RUNNING".parse::<TournamentStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TournamentStatus::Created.is_terminal());
        assert!(!TournamentStatus::InProgress.is_terminal());
        assert!(TournamentStatus::Completed.is_terminal());
        assert!(TournamentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_round_completion_check() {
        assert!(round(false, &[]).all_matches_completed());
        assert!(round(false, &[MatchStatus::Completed, MatchStatus::Completed]).all_matches_completed());

        let r = round(false, &[MatchStatus::Completed, MatchStatus::InProgress]);
        assert!(!r.all_matches_completed());
        assert_eq!(r.pending_match_count(), 1);

        // A cancelled match still blocks completion
        assert!(!round(false, &[MatchStatus::Cancelled]).all_matches_completed());
    }

    #[test]
    fn test_next_round_number_and_enrollment() {
        let tournament = Tournament {
            id: 3,
            name: "Open".to_string(),
            start_date: None,
            end_date: None,
            status: TournamentStatus::InProgress,
            enrollments: vec![Enrollment::new(1), Enrollment { player_id: 2, ranking: 4 }],
            rounds: vec![round(true, &[MatchStatus::Completed])],
        };

        assert_eq!(tournament.next_round_number(), 2);
        assert_eq!(tournament.player_count(), 2);
        assert!(tournament.is_enrolled(2));
        assert!(!tournament.is_enrolled(9));
        assert_eq!(tournament.ranking_of(2), Some(4));
        assert!(tournament.first_open_round().is_none());
    }
}
