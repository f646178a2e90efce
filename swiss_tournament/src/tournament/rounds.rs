//! Round creation through the pairing engine, round completion and standings.

use super::manager::{TournamentManager, ensure_open};
use super::models::{NewRound, Round, RoundId, TournamentId};
use crate::errors::{Entity, TournamentError, TournamentResult};
use crate::pairing::{pair_round, played_pairings, rank_players};
use crate::player::models::Player;
use log::{debug, info};

impl TournamentManager {
    /// Pair the enrolled players and persist the next round with its matches
    ///
    /// Players are ranked by win/loss differential, paired with the nearest
    /// opponent they have not met in this tournament, and an odd player out
    /// receives a bye. Concurrent calls on one tournament are serialized and
    /// receive consecutive round numbers.
    pub async fn create_next_round(&self, tournament_id: TournamentId) -> TournamentResult<Round> {
        let _guard = self.locks.acquire(tournament_id).await;
        let tournament = self.load(tournament_id).await?;
        ensure_open(&tournament, "create rounds")?;

        let players = self.repo.find_players_by_tournament(tournament_id).await?;
        let ranked = rank_players(&players);
        let played = played_pairings(&tournament.rounds);
        debug!(
            "Pairing {} players for tournament {tournament_id}, {} pairings already played",
            ranked.len(),
            played.len()
        );

        let pairing = pair_round(&ranked, &played);
        let new_round = NewRound {
            round_number: tournament.next_round_number(),
            matches: pairing.matches,
        };

        let round = self.repo.insert_round(tournament_id, &new_round).await?;
        info!(
            "Tournament {tournament_id} round {} created with {} matches",
            round.round_number,
            round.matches.len()
        );
        Ok(round)
    }

    /// Mark a round completed once every match in it is COMPLETED
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Unknown round
    /// * `TournamentError::InvalidStateTransition` - Already completed, or a
    ///   match is still pending
    pub async fn complete_round(&self, round_id: RoundId) -> TournamentResult<Round> {
        let tournament_id = self.load_round(round_id).await?.tournament_id;
        let _guard = self.locks.acquire(tournament_id).await;
        let mut round = self.load_round(round_id).await?;

        if round.completed {
            return Err(TournamentError::invalid_transition(
                Entity::Round,
                round_id,
                "round is already completed",
            ));
        }
        if !round.all_matches_completed() {
            return Err(TournamentError::invalid_transition(
                Entity::Round,
                round_id,
                format!("{} matches are not completed", round.pending_match_count()),
            ));
        }

        round.completed = true;
        self.repo.update_round(&round).await?;
        info!(
            "Tournament {tournament_id} round {} completed",
            round.round_number
        );
        Ok(round)
    }

    /// Rounds of a tournament ordered by round number
    pub async fn tournament_rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>> {
        self.load(tournament_id).await?;
        Ok(self.repo.find_rounds_by_tournament(tournament_id).await?)
    }

    /// Enrolled players in the order the pairing engine ranks them
    pub async fn standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Player>> {
        self.load(tournament_id).await?;
        let players = self.repo.find_players_by_tournament(tournament_id).await?;
        Ok(rank_players(&players).into_iter().cloned().collect())
    }

    async fn load_round(&self, round_id: RoundId) -> TournamentResult<Round> {
        self.repo
            .find_round(round_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Round, round_id))
    }
}
