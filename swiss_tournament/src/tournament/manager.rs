//! Tournament manager: creation, enrollment and lifecycle transitions.

use super::{
    locks::TournamentLocks,
    models::{Enrollment, NewTournament, Tournament, TournamentId, TournamentStatus},
    stats,
};
use crate::db::Repository;
use crate::errors::{Entity, TournamentError, TournamentResult};
use crate::player::models::{Player, PlayerId};
use chrono::NaiveDate;
use log::info;
use std::collections::HashSet;
use std::sync::Arc;

/// Minimum enrollment required to start
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    pub(super) repo: Arc<dyn Repository>,
    pub(super) locks: TournamentLocks,
}

/// Reject empty names and an end date before the start date
fn validate_details(
    name: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> TournamentResult<()> {
    if name.trim().is_empty() {
        return Err(TournamentError::validation("name", "must not be empty"));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(TournamentError::validation(
                "end_date",
                format!("{end} is before start date {start}"),
            ));
        }
    }
    Ok(())
}

/// Enrollment changes and round creation are only allowed before a terminal state
pub(crate) fn ensure_open(tournament: &Tournament, action: &str) -> TournamentResult<()> {
    if tournament.status.is_terminal() {
        return Err(TournamentError::invalid_transition(
            Entity::Tournament,
            tournament.id,
            format!("cannot {action} while {}", tournament.status),
        ));
    }
    Ok(())
}

impl TournamentManager {
    /// Create a new tournament manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Persistence gateway
    /// * `locks` - Lock registry shared with the match manager
    pub fn new(repo: Arc<dyn Repository>, locks: TournamentLocks) -> Self {
        Self { repo, locks }
    }

    pub(super) async fn load(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .find_tournament(tournament_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Tournament, tournament_id))
    }

    async fn require_player(&self, player_id: PlayerId) -> TournamentResult<Player> {
        self.repo
            .find_player(player_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Player, player_id))
    }

    /// Create a tournament in CREATED state with the given players enrolled
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Empty name, end before start, or a
    ///   player listed twice
    /// * `TournamentError::NotFound` - A player id does not exist
    pub async fn create_tournament(&self, tournament: NewTournament) -> TournamentResult<Tournament> {
        validate_details(&tournament.name, tournament.start_date, tournament.end_date)?;

        let mut seen = HashSet::new();
        for &player_id in &tournament.player_ids {
            if !seen.insert(player_id) {
                return Err(TournamentError::validation(
                    "player_ids",
                    format!("player {player_id} listed more than once"),
                ));
            }
            self.require_player(player_id).await?;
        }

        let created = self.repo.insert_tournament(&tournament).await?;
        info!(
            "Created tournament {} '{}' with {} players",
            created.id,
            created.name,
            created.player_count()
        );
        Ok(created)
    }

    /// Load a tournament with its enrollments, rounds and matches
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.load(tournament_id).await
    }

    /// All tournaments ordered by id
    pub async fn list_tournaments(&self) -> TournamentResult<Vec<Tournament>> {
        Ok(self.repo.find_all_tournaments().await?)
    }

    /// Change name and dates of a tournament that is not finished
    pub async fn update_tournament_details(
        &self,
        tournament_id: TournamentId,
        name: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> TournamentResult<Tournament> {
        validate_details(name, start_date, end_date)?;

        let _guard = self.locks.acquire(tournament_id).await;
        let mut tournament = self.load(tournament_id).await?;
        ensure_open(&tournament, "edit details")?;

        tournament.name = name.trim().to_string();
        tournament.start_date = start_date;
        tournament.end_date = end_date;
        self.repo.update_tournament(&tournament).await?;
        Ok(tournament)
    }

    /// Add a player to the tournament with ranking 0
    pub async fn enroll_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Tournament> {
        let _guard = self.locks.acquire(tournament_id).await;
        let mut tournament = self.load(tournament_id).await?;
        ensure_open(&tournament, "enroll players")?;
        self.require_player(player_id).await?;

        if tournament.is_enrolled(player_id) {
            return Err(TournamentError::validation(
                "player_id",
                format!("player {player_id} is already enrolled in tournament {tournament_id}"),
            ));
        }

        tournament.enrollments.push(Enrollment::new(player_id));
        self.repo.update_tournament(&tournament).await?;
        info!("Enrolled player {player_id} in tournament {tournament_id}");
        Ok(tournament)
    }

    /// Remove a player and their ranking from the tournament
    ///
    /// Matches already played stay in their rounds.
    pub async fn withdraw_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Tournament> {
        let _guard = self.locks.acquire(tournament_id).await;
        let mut tournament = self.load(tournament_id).await?;
        ensure_open(&tournament, "withdraw players")?;

        if !tournament.is_enrolled(player_id) {
            return Err(TournamentError::not_found(Entity::Player, player_id));
        }

        tournament.enrollments.retain(|e| e.player_id != player_id);
        self.repo.update_tournament(&tournament).await?;
        info!("Withdrew player {player_id} from tournament {tournament_id}");
        Ok(tournament)
    }

    /// Move a CREATED tournament with enough players to IN_PROGRESS
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Unknown tournament
    /// * `TournamentError::InvalidStateTransition` - Not CREATED
    /// * `TournamentError::Validation` - Fewer than two players enrolled
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let _guard = self.locks.acquire(tournament_id).await;
        let mut tournament = self.load(tournament_id).await?;

        if tournament.status != TournamentStatus::Created {
            return Err(TournamentError::invalid_transition(
                Entity::Tournament,
                tournament_id,
                format!("must be CREATED to start, is {}", tournament.status),
            ));
        }
        if tournament.player_count() < MIN_PLAYERS_TO_START {
            return Err(TournamentError::validation(
                "players",
                format!(
                    "need at least {MIN_PLAYERS_TO_START} players to start, have {}",
                    tournament.player_count()
                ),
            ));
        }

        tournament.status = TournamentStatus::InProgress;
        self.repo.update_tournament(&tournament).await?;
        info!("Tournament {tournament_id} started");
        Ok(tournament)
    }

    /// Finish a tournament whose rounds are all completed and credit the results
    ///
    /// The status change and every player's win/loss increments are written
    /// in one transaction. Increments are applied by the store, so tournaments
    /// sharing players may complete concurrently.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Unknown tournament
    /// * `TournamentError::InvalidStateTransition` - Not IN_PROGRESS, or a
    ///   round is still open
    pub async fn complete_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        let _guard = self.locks.acquire(tournament_id).await;
        let mut tournament = self.load(tournament_id).await?;

        if tournament.status != TournamentStatus::InProgress {
            return Err(TournamentError::invalid_transition(
                Entity::Tournament,
                tournament_id,
                format!("must be IN_PROGRESS to complete, is {}", tournament.status),
            ));
        }
        if let Some(open) = tournament.first_open_round() {
            return Err(TournamentError::invalid_transition(
                Entity::Tournament,
                tournament_id,
                format!("round {} is not completed", open.round_number),
            ));
        }

        tournament.status = TournamentStatus::Completed;

        let mut deltas = stats::aggregate(&tournament);
        deltas.retain(|_, delta| !delta.is_zero());

        self.repo.record_completion(&tournament, &deltas).await?;
        info!(
            "Tournament {tournament_id} completed after {} rounds, {} player records updated",
            tournament.rounds.len(),
            deltas.len()
        );
        Ok(tournament)
    }

    /// Call off a tournament that is not finished; no statistics are applied
    pub async fn cancel_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        let _guard = self.locks.acquire(tournament_id).await;
        let mut tournament = self.load(tournament_id).await?;

        if tournament.status.is_terminal() {
            return Err(TournamentError::invalid_transition(
                Entity::Tournament,
                tournament_id,
                format!("cannot cancel a {} tournament", tournament.status),
            ));
        }

        tournament.status = TournamentStatus::Cancelled;
        self.repo.update_tournament(&tournament).await?;
        info!("Tournament {tournament_id} cancelled");
        Ok(tournament)
    }

    /// Delete a tournament with its rounds, matches and enrollments
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        {
            let _guard = self.locks.acquire(tournament_id).await;
            self.load(tournament_id).await?;
            self.repo.delete_tournament(tournament_id).await?;
        }
        self.locks.forget(tournament_id).await;
        info!("Tournament {tournament_id} deleted");
        Ok(())
    }
}
