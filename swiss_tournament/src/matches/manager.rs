//! Match result processing.

use super::models::{Match, MatchId, MatchStatus};
use crate::db::Repository;
use crate::errors::{Entity, TournamentError, TournamentResult};
use crate::tournament::{RoundId, TournamentLocks};
use log::info;
use std::sync::Arc;

/// Match manager
#[derive(Clone)]
pub struct MatchManager {
    repo: Arc<dyn Repository>,
    locks: TournamentLocks,
}

impl MatchManager {
    /// Create a new match manager
    pub fn new(repo: Arc<dyn Repository>, locks: TournamentLocks) -> Self {
        Self { repo, locks }
    }

    async fn load(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.repo
            .find_match(match_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Match, match_id))
    }

    /// Run `change` on the match while holding its tournament's lock, then persist it
    async fn mutate<F>(&self, match_id: MatchId, change: F) -> TournamentResult<Match>
    where
        F: FnOnce(&mut Match) -> TournamentResult<()>,
    {
        let round_id = self.load(match_id).await?.round_id;
        let round = self
            .repo
            .find_round(round_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Round, round_id))?;

        let _guard = self.locks.acquire(round.tournament_id).await;
        let mut m = self.load(match_id).await?;
        change(&mut m)?;
        self.repo.update_match(&m).await?;
        Ok(m)
    }

    /// Move a SCHEDULED match to IN_PROGRESS
    pub async fn start_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let m = self
            .mutate(match_id, |m| {
                if m.status != MatchStatus::Scheduled {
                    return Err(TournamentError::invalid_transition(
                        Entity::Match,
                        m.id,
                        format!("must be SCHEDULED to start, is {}", m.status),
                    ));
                }
                m.status = MatchStatus::InProgress;
                Ok(())
            })
            .await?;
        info!("Match {match_id} started");
        Ok(m)
    }

    /// Record the final score; the higher score wins and a tie has no winner
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Unknown match
    /// * `TournamentError::InvalidStateTransition` - Match already COMPLETED
    pub async fn set_match_result(
        &self,
        match_id: MatchId,
        score_player1: i32,
        score_player2: i32,
    ) -> TournamentResult<Match> {
        let m = self
            .mutate(match_id, |m| {
                if m.status == MatchStatus::Completed {
                    return Err(TournamentError::invalid_transition(
                        Entity::Match,
                        m.id,
                        "result already recorded",
                    ));
                }
                m.record_result(score_player1, score_player2);
                Ok(())
            })
            .await?;
        match m.winner {
            Some(winner) => info!(
                "Match {match_id} finished {score_player1}-{score_player2}, winner {winner}"
            ),
            None => info!("Match {match_id} finished {score_player1}-{score_player2}, draw"),
        }
        Ok(m)
    }

    /// Call off a match that has not been completed
    pub async fn cancel_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let m = self
            .mutate(match_id, |m| {
                if m.status == MatchStatus::Completed {
                    return Err(TournamentError::invalid_transition(
                        Entity::Match,
                        m.id,
                        "cannot cancel a completed match",
                    ));
                }
                m.status = MatchStatus::Cancelled;
                Ok(())
            })
            .await?;
        info!("Match {match_id} cancelled");
        Ok(m)
    }

    /// Look up a match by id
    pub async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.load(match_id).await
    }

    /// Matches of a round ordered by id
    pub async fn round_matches(&self, round_id: RoundId) -> TournamentResult<Vec<Match>> {
        if self.repo.find_round(round_id).await?.is_none() {
            return Err(TournamentError::not_found(Entity::Round, round_id));
        }
        Ok(self.repo.find_matches_by_round(round_id).await?)
    }
}
