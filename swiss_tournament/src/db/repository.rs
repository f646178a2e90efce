//! Repository trait definitions for testability and dependency injection.
//!
//! Multi-row writes (`insert_tournament`, `update_tournament`,
//! `delete_tournament`, `update_player`, `delete_player`, `insert_round`,
//! `delete_round`, `record_completion`) are transactional: an implementation
//! must either apply every statement or none.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::errors::StoreResult;
use crate::matches::models::{Match, MatchId};
use crate::player::models::{NewPlayer, Player, PlayerId};
use crate::tournament::models::{
    NewRound, NewTournament, Round, RoundId, Tournament, TournamentId,
};
use crate::tournament::stats::RecordDelta;

/// Trait for player storage operations
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Insert a player with zeroed statistics and no enrollments
    async fn insert_player(&self, player: &NewPlayer) -> StoreResult<Player>;

    /// Update name and email and replace the enrollment rows with `player.rankings`
    ///
    /// Win/loss counters are only changed by `record_completion`.
    async fn update_player(&self, player: &Player) -> StoreResult<()>;

    /// Delete the player together with its matches and enrollment rows
    async fn delete_player(&self, player_id: PlayerId) -> StoreResult<()>;

    /// Find player by ID
    async fn find_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>>;

    /// All players ordered by ID
    async fn find_all_players(&self) -> StoreResult<Vec<Player>>;

    /// Find player by exact name
    async fn find_player_by_name(&self, name: &str) -> StoreResult<Option<Player>>;

    /// Find player by exact email
    async fn find_player_by_email(&self, email: &str) -> StoreResult<Option<Player>>;

    /// Players enrolled in a tournament, in enrollment order
    async fn find_players_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Player>>;

    /// Set a player's ranking in a tournament, creating the enrollment if missing
    async fn upsert_ranking(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        ranking: i32,
    ) -> StoreResult<()>;
}

/// Trait for tournament storage operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert the tournament row and one enrollment per player
    async fn insert_tournament(&self, tournament: &NewTournament) -> StoreResult<Tournament>;

    /// Update the tournament row and rewrite its enrollment rows
    ///
    /// Rounds are not touched.
    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Delete the tournament, its rounds and their matches, and its enrollment rows
    async fn delete_tournament(&self, tournament_id: TournamentId) -> StoreResult<()>;

    /// Load a tournament with enrollments, rounds and matches
    async fn find_tournament(&self, tournament_id: TournamentId)
    -> StoreResult<Option<Tournament>>;

    /// All tournaments ordered by ID
    async fn find_all_tournaments(&self) -> StoreResult<Vec<Tournament>>;

    /// Persist a completed tournament's status and add each delta to the
    /// player's stored counters
    async fn record_completion(
        &self,
        tournament: &Tournament,
        deltas: &BTreeMap<PlayerId, RecordDelta>,
    ) -> StoreResult<()>;
}

/// Trait for round storage operations
#[async_trait]
pub trait RoundRepository: Send + Sync {
    /// Insert a round together with all of its matches
    async fn insert_round(
        &self,
        tournament_id: TournamentId,
        round: &NewRound,
    ) -> StoreResult<Round>;

    /// Update round number and completed flag
    async fn update_round(&self, round: &Round) -> StoreResult<()>;

    /// Delete the round and its matches
    async fn delete_round(&self, round_id: RoundId) -> StoreResult<()>;

    /// Load a round with its matches
    async fn find_round(&self, round_id: RoundId) -> StoreResult<Option<Round>>;

    /// Rounds of a tournament ordered by round number
    async fn find_rounds_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Round>>;
}

/// Trait for match storage operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Update players, winner, scores and status
    async fn update_match(&self, m: &Match) -> StoreResult<()>;

    /// Delete a single match
    async fn delete_match(&self, match_id: MatchId) -> StoreResult<()>;

    /// Find match by ID
    async fn find_match(&self, match_id: MatchId) -> StoreResult<Option<Match>>;

    /// Matches of a round ordered by ID
    async fn find_matches_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Match>>;
}

/// The full persistence gateway
pub trait Repository:
    PlayerRepository + TournamentRepository + RoundRepository + MatchRepository
{
}

impl<T> Repository for T where
    T: PlayerRepository + TournamentRepository + RoundRepository + MatchRepository
{
}
