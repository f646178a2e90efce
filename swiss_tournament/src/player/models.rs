//! Player data models.

use crate::tournament::models::TournamentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Player ID type
pub type PlayerId = i64;

/// A registered player
///
/// `games_won` / `games_lost` accumulate across tournaments and change only
/// when a tournament completes. `rankings` holds
/// one entry per tournament the player is enrolled in; its keys are the
/// player's tournaments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: Option<String>,
    pub games_won: i32,
    pub games_lost: i32,
    pub rankings: BTreeMap<TournamentId, i32>,
}

impl Player {
    /// Wins minus losses, the value the pairing engine ranks by
    pub fn score_differential(&self) -> i32 {
        self.games_won - self.games_lost
    }

    /// Ranking within a tournament, if enrolled
    pub fn ranking_in(&self, tournament_id: TournamentId) -> Option<i32> {
        self.rankings.get(&tournament_id).copied()
    }

    /// Tournaments this player is enrolled in
    pub fn tournament_ids(&self) -> impl Iterator<Item = TournamentId> + '_ {
        self.rankings.keys().copied()
    }
}

/// Input for creating a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    pub email: Option<String>,
}

impl NewPlayer {
    /// Build a new player, trimming the name and dropping a blank email
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: normalize_email(email),
        }
    }
}

/// Blank emails are treated as absent
pub(crate) fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}
