//! Match data models.

use crate::player::models::PlayerId;
use crate::tournament::models::RoundId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Match ID type
pub type MatchId = i64;

/// Match state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Paired, not yet played
    Scheduled,
    /// Being played
    InProgress,
    /// Result recorded (terminal)
    Completed,
    /// Called off (terminal)
    Cancelled,
}

impl MatchStatus {
    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::InProgress => "IN_PROGRESS",
            MatchStatus::Completed => "COMPLETED",
            MatchStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(MatchStatus::Scheduled),
            "IN_PROGRESS" => Ok(MatchStatus::InProgress),
            "COMPLETED" => Ok(MatchStatus::Completed),
            "CANCELLED" => Ok(MatchStatus::Cancelled),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

/// A single pairing inside a round
///
/// `player2 == None` is a bye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub round_id: RoundId,
    pub player1: PlayerId,
    pub player2: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    pub score_player1: i32,
    pub score_player2: i32,
    pub status: MatchStatus,
}

impl Match {
    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.player1 == player_id || self.player2 == Some(player_id)
    }

    /// The player who did not win, when there is a winner and an opponent
    pub fn loser(&self) -> Option<PlayerId> {
        let winner = self.winner?;
        let player2 = self.player2?;
        if winner == self.player1 {
            Some(player2)
        } else {
            Some(self.player1)
        }
    }

    /// Record the final score and derive the winner; a tie has no winner
    pub fn record_result(&mut self, score_player1: i32, score_player2: i32) {
        self.score_player1 = score_player1;
        self.score_player2 = score_player2;
        self.winner = if score_player1 > score_player2 {
            Some(self.player1)
        } else if score_player2 > score_player1 {
            self.player2
        } else {
            None
        };
        self.status = MatchStatus::Completed;
    }
}

/// A match generated by the pairing engine, before it has an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub player1: PlayerId,
    pub player2: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    pub status: MatchStatus,
}

impl NewMatch {
    /// A scheduled match between two players
    pub fn pairing(player1: PlayerId, player2: PlayerId) -> Self {
        Self {
            player1,
            player2: Some(player2),
            winner: None,
            status: MatchStatus::Scheduled,
        }
    }

    /// A bye: already completed, won by the unpaired player
    pub fn bye(player: PlayerId) -> Self {
        Self {
            player1: player,
            player2: None,
            winner: Some(player),
            status: MatchStatus::Completed,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }

    /// Attach ids assigned by storage
    pub fn into_match(self, id: MatchId, round_id: RoundId) -> Match {
        Match {
            id,
            round_id,
            player1: self.player1,
            player2: self.player2,
            winner: self.winner,
            score_player1: 0,
            score_player2: 0,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled(player1: PlayerId, player2: PlayerId) -> Match {
        NewMatch::pairing(player1, player2).into_match(1, 1)
    }

    #[test]
    fn test_player1_wins() {
        let mut m = scheduled(1, 2);
        m.record_result(3, 1);
        assert_eq!(m.winner, Some(1));
        assert_eq!(m.loser(), Some(2));
        assert_eq!(m.status, MatchStatus::Completed);
    }

    #[test]
    fn test_player2_wins() {
        let mut m = scheduled(1, 2);
        m.record_result(0, 2);
        assert_eq!(m.winner, Some(2));
        assert_eq!(m.loser(), Some(1));
    }

    #[test]
    fn test_tie_has_no_winner() {
        let mut m = scheduled(1, 2);
        m.record_result(2, 2);
        assert_eq!(m.winner, None);
        assert_eq!(m.loser(), None);
        assert_eq!(m.status, MatchStatus::Completed);
    }

    #[test]
    fn test_bye_is_completed_with_winner() {
        let bye = NewMatch::bye(5).into_match(9, 3);
        assert!(bye.is_bye());
        assert_eq!(bye.winner, Some(5));
        assert_eq!(bye.status, MatchStatus::Completed);
        assert_eq!(bye.loser(), None);
        assert!(bye.involves(5));
        assert!(!bye.involves(6));
    }

    #[test]
    fn test_status_string_mapping() {
        for status in [
            MatchStatus::Scheduled,
            MatchStatus::InProgress,
            MatchStatus::Completed,
            MatchStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<MatchStatus>(), Ok(status));
        }
        assert!("FINISHED".parse::<MatchStatus>().is_err());
    }
}
