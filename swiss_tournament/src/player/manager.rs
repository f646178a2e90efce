//! Player manager: registration, profile edits, rankings and deletion.

use super::models::{NewPlayer, Player, PlayerId, normalize_email};
use crate::db::{Repository, StoreError};
use crate::errors::{Entity, TournamentError, TournamentResult};
use crate::tournament::manager::ensure_open;
use crate::tournament::{Tournament, TournamentId, TournamentLocks};
use log::{debug, info};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Player manager
#[derive(Clone)]
pub struct PlayerManager {
    repo: Arc<dyn Repository>,
    locks: TournamentLocks,
}

impl PlayerManager {
    /// Create a new player manager
    pub fn new(repo: Arc<dyn Repository>, locks: TournamentLocks) -> Self {
        Self { repo, locks }
    }

    async fn load(&self, player_id: PlayerId) -> TournamentResult<Player> {
        self.repo
            .find_player(player_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Player, player_id))
    }

    /// Name and email must be free, ignoring the player being edited
    async fn ensure_unique(
        &self,
        player_id: Option<PlayerId>,
        name: &str,
        email: Option<&str>,
    ) -> TournamentResult<()> {
        if let Some(other) = self.repo.find_player_by_name(name).await? {
            if Some(other.id) != player_id {
                return Err(TournamentError::validation(
                    "name",
                    format!("'{name}' is already taken"),
                ));
            }
        }
        if let Some(email) = email {
            if let Some(other) = self.repo.find_player_by_email(email).await? {
                if Some(other.id) != player_id {
                    return Err(TournamentError::validation(
                        "email",
                        format!("'{email}' is already registered"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Turn a constraint violation lost to a concurrent writer into the
    /// validation error the pre-check would have reported
    async fn explain_conflict(
        &self,
        err: StoreError,
        player_id: Option<PlayerId>,
        name: &str,
        email: Option<&str>,
    ) -> TournamentError {
        match err {
            StoreError::Constraint(reason) => {
                debug!("Constraint violation while saving player '{name}': {reason}");
                match self.ensure_unique(player_id, name, email).await {
                    Err(conflict) => conflict,
                    Ok(()) => StoreError::Constraint(reason).into(),
                }
            }
            other => other.into(),
        }
    }

    async fn require_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .find_tournament(tournament_id)
            .await?
            .ok_or_else(|| TournamentError::not_found(Entity::Tournament, tournament_id))
    }

    /// Lock every tournament the player belongs to now or will belong to
    /// after `wanted`, and return the player as stored under those locks
    async fn lock_memberships(
        &self,
        player_id: PlayerId,
        wanted: &BTreeSet<TournamentId>,
    ) -> TournamentResult<(Vec<OwnedMutexGuard<()>>, Player)> {
        loop {
            let seen = self.load(player_id).await?;
            let locked: BTreeSet<TournamentId> =
                seen.tournament_ids().chain(wanted.iter().copied()).collect();
            let guards = self.locks.acquire_many(locked.iter().copied()).await;

            let current = self.load(player_id).await?;
            if current.tournament_ids().all(|id| locked.contains(&id)) {
                return Ok((guards, current));
            }
            debug!("Player {player_id} joined another tournament while locking; retrying");
        }
    }

    /// Register a player with zeroed statistics
    ///
    /// # Arguments
    ///
    /// * `name` - Display name, trimmed, must be unique
    /// * `email` - Optional contact address; blank counts as absent
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Empty name, or name/email taken
    pub async fn create_player(
        &self,
        name: &str,
        email: Option<String>,
    ) -> TournamentResult<Player> {
        let new_player = NewPlayer::new(name, email);
        if new_player.name.is_empty() {
            return Err(TournamentError::validation("name", "must not be empty"));
        }
        self.ensure_unique(None, &new_player.name, new_player.email.as_deref())
            .await?;

        let player = match self.repo.insert_player(&new_player).await {
            Ok(player) => player,
            Err(err) => {
                return Err(self
                    .explain_conflict(err, None, &new_player.name, new_player.email.as_deref())
                    .await);
            }
        };
        info!("Registered player {} '{}'", player.id, player.name);
        Ok(player)
    }

    /// Save a player's name, email and tournament rankings
    ///
    /// Every key of `player.rankings` must be an existing tournament; the
    /// player's enrollment rows are rewritten to match the map. Joining or
    /// leaving a tournament is only allowed while it is not finished; changing
    /// the ranking of an existing enrollment always is. Win/loss counters in
    /// `player` are ignored: they only change when a tournament completes.
    pub async fn update_player(&self, mut player: Player) -> TournamentResult<Player> {
        player.name = player.name.trim().to_string();
        player.email = normalize_email(player.email);
        if player.name.is_empty() {
            return Err(TournamentError::validation("name", "must not be empty"));
        }
        self.ensure_unique(Some(player.id), &player.name, player.email.as_deref())
            .await?;

        let wanted: BTreeSet<TournamentId> = player.tournament_ids().collect();
        let (_guards, current) = self.lock_memberships(player.id, &wanted).await?;

        for &tournament_id in &wanted {
            let tournament = self.require_tournament(tournament_id).await?;
            if !current.rankings.contains_key(&tournament_id) {
                ensure_open(&tournament, "enroll players")?;
            }
        }
        for tournament_id in current.tournament_ids().filter(|id| !wanted.contains(id)) {
            let tournament = self.require_tournament(tournament_id).await?;
            ensure_open(&tournament, "withdraw players")?;
        }

        if let Err(err) = self.repo.update_player(&player).await {
            return Err(self
                .explain_conflict(err, Some(player.id), &player.name, player.email.as_deref())
                .await);
        }
        self.load(player.id).await
    }

    /// Delete a player, their enrollments and every match they played
    pub async fn delete_player(&self, player_id: PlayerId) -> TournamentResult<()> {
        let (_guards, player) = self.lock_memberships(player_id, &BTreeSet::new()).await?;
        self.repo.delete_player(player_id).await?;
        info!(
            "Deleted player {player_id} '{}' from {} tournaments",
            player.name,
            player.rankings.len()
        );
        Ok(())
    }

    /// Set a player's ranking in a tournament, enrolling them if needed
    ///
    /// Enrolling requires a tournament that is not finished.
    pub async fn update_player_ranking(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        ranking: i32,
    ) -> TournamentResult<Player> {
        let _guard = self.locks.acquire(tournament_id).await;
        self.load(player_id).await?;
        let tournament = self.require_tournament(tournament_id).await?;
        if tournament.ranking_of(player_id).is_none() {
            ensure_open(&tournament, "enroll players")?;
        }

        self.repo
            .upsert_ranking(player_id, tournament_id, ranking)
            .await?;
        self.load(player_id).await
    }

    /// Look up a player by id
    pub async fn get_player(&self, player_id: PlayerId) -> TournamentResult<Player> {
        self.load(player_id).await
    }

    /// Look up a player by exact name
    pub async fn find_player_by_name(&self, name: &str) -> TournamentResult<Option<Player>> {
        Ok(self.repo.find_player_by_name(name.trim()).await?)
    }

    /// Look up a player by exact email
    pub async fn find_player_by_email(&self, email: &str) -> TournamentResult<Option<Player>> {
        Ok(self.repo.find_player_by_email(email.trim()).await?)
    }

    /// All players ordered by id
    pub async fn list_players(&self) -> TournamentResult<Vec<Player>> {
        Ok(self.repo.find_all_players().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn manager() -> PlayerManager {
        PlayerManager::new(Arc::new(MemoryStore::new()), TournamentLocks::new())
    }

    #[tokio::test]
    async fn test_lost_registration_race_reports_taken_name() {
        let manager = manager();
        manager
            .create_player("Ada", Some("ada@example.com".to_string()))
            .await
            .unwrap();

        // The pre-check passed before the competing row was committed
        let violation = || StoreError::Constraint("duplicate key value".to_string());
        let err = manager
            .explain_conflict(violation(), None, "Ada", None)
            .await;
        assert!(matches!(err, TournamentError::Validation { field: "name", .. }));

        let err = manager
            .explain_conflict(violation(), None, "Grace", Some("ada@example.com"))
            .await;
        assert!(matches!(err, TournamentError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn test_other_store_errors_pass_through() {
        let manager = manager();

        let err = manager
            .explain_conflict(
                StoreError::Constraint("foreign key".to_string()),
                None,
                "Nobody",
                None,
            )
            .await;
        assert!(matches!(
            err,
            TournamentError::Persistence(StoreError::Constraint(_))
        ));

        let err = manager
            .explain_conflict(StoreError::Fault("disk".to_string()), None, "Ada", None)
            .await;
        assert!(matches!(err, TournamentError::Persistence(StoreError::Fault(_))));
    }
}
