//! In-process implementation of the persistence gateway.
//!
//! Tables live behind a single mutex. A write clones the tables, applies every
//! statement to the copy, and swaps the copy in only when all of them
//! succeeded, which gives each gateway call the same all-or-nothing behavior
//! as a database transaction. [`FailPoint`]s let tests make a chosen statement
//! fail in the middle of such a sequence.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::errors::{StoreError, StoreResult};
use super::repository::{MatchRepository, PlayerRepository, RoundRepository, TournamentRepository};
use crate::matches::models::{Match, MatchId};
use crate::player::models::{NewPlayer, Player, PlayerId};
use crate::tournament::models::{
    Enrollment, NewRound, NewTournament, Round, RoundId, Tournament, TournamentId,
    TournamentStatus,
};
use crate::tournament::stats::RecordDelta;

/// Statements that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Inserting a tournament/player relationship row
    EnrollmentInsert,
    /// Inserting a match while saving a round
    MatchInsert,
    /// Deleting matches during a cascade
    MatchDelete,
    /// Writing a player's counters during tournament completion
    PlayerStatsUpdate,
}

#[derive(Debug, Clone)]
struct PlayerRow {
    id: PlayerId,
    name: String,
    email: Option<String>,
    games_won: i32,
    games_lost: i32,
}

#[derive(Debug, Clone)]
struct TournamentRow {
    id: TournamentId,
    name: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    status: TournamentStatus,
}

#[derive(Debug, Clone)]
struct EnrollmentRow {
    tournament_id: TournamentId,
    player_id: PlayerId,
    ranking: i32,
    seat: i32,
}

#[derive(Debug, Clone)]
struct RoundRow {
    id: RoundId,
    tournament_id: TournamentId,
    round_number: i32,
    completed: bool,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    players: BTreeMap<PlayerId, PlayerRow>,
    tournaments: BTreeMap<TournamentId, TournamentRow>,
    enrollments: Vec<EnrollmentRow>,
    rounds: BTreeMap<RoundId, RoundRow>,
    matches: BTreeMap<MatchId, Match>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn player(&self, row: &PlayerRow) -> Player {
        Player {
            id: row.id,
            name: row.name.clone(),
            email: row.email.clone(),
            games_won: row.games_won,
            games_lost: row.games_lost,
            rankings: self
                .enrollments
                .iter()
                .filter(|e| e.player_id == row.id)
                .map(|e| (e.tournament_id, e.ranking))
                .collect(),
        }
    }

    fn round(&self, row: &RoundRow) -> Round {
        Round {
            id: row.id,
            tournament_id: row.tournament_id,
            round_number: row.round_number,
            completed: row.completed,
            matches: self
                .matches
                .values()
                .filter(|m| m.round_id == row.id)
                .cloned()
                .collect(),
        }
    }

    fn rounds_of(&self, tournament_id: TournamentId) -> Vec<Round> {
        let mut rows: Vec<&RoundRow> = self
            .rounds
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .collect();
        rows.sort_by_key(|r| r.round_number);
        rows.into_iter().map(|r| self.round(r)).collect()
    }

    fn seats_of(&self, tournament_id: TournamentId) -> Vec<&EnrollmentRow> {
        let mut rows: Vec<&EnrollmentRow> = self
            .enrollments
            .iter()
            .filter(|e| e.tournament_id == tournament_id)
            .collect();
        rows.sort_by_key(|e| e.seat);
        rows
    }

    fn tournament(&self, row: &TournamentRow) -> Tournament {
        Tournament {
            id: row.id,
            name: row.name.clone(),
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status,
            enrollments: self
                .seats_of(row.id)
                .into_iter()
                .map(|e| Enrollment {
                    player_id: e.player_id,
                    ranking: e.ranking,
                })
                .collect(),
            rounds: self.rounds_of(row.id),
        }
    }

    fn next_seat(&self, tournament_id: TournamentId) -> i32 {
        self.enrollments
            .iter()
            .filter(|e| e.tournament_id == tournament_id)
            .map(|e| e.seat + 1)
            .max()
            .unwrap_or(0)
    }

    fn check_player_unique(
        &self,
        id: Option<PlayerId>,
        name: &str,
        email: Option<&str>,
    ) -> StoreResult<()> {
        for other in self.players.values().filter(|p| Some(p.id) != id) {
            if other.name == name {
                return Err(StoreError::Constraint(format!(
                    "players.name '{name}' already exists"
                )));
            }
            if email.is_some() && other.email.as_deref() == email {
                return Err(StoreError::Constraint(format!(
                    "players.email '{}' already exists",
                    email.unwrap_or_default()
                )));
            }
        }
        Ok(())
    }

    fn insert_enrollment(&mut self, row: EnrollmentRow) -> StoreResult<()> {
        if !self.players.contains_key(&row.player_id) {
            return Err(StoreError::Constraint(format!(
                "tournament_players.player_id {} references no player",
                row.player_id
            )));
        }
        if !self.tournaments.contains_key(&row.tournament_id) {
            return Err(StoreError::Constraint(format!(
                "tournament_players.tournament_id {} references no tournament",
                row.tournament_id
            )));
        }
        if self
            .enrollments
            .iter()
            .any(|e| e.tournament_id == row.tournament_id && e.player_id == row.player_id)
        {
            return Err(StoreError::Constraint(format!(
                "player {} already enrolled in tournament {}",
                row.player_id, row.tournament_id
            )));
        }
        self.enrollments.push(row);
        Ok(())
    }
}

/// In-memory gateway
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    armed: Mutex<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next statement at `point` fail, rolling back its transaction
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.insert(point);
        }
    }

    fn trip(&self, point: FailPoint) -> StoreResult<()> {
        let mut armed = self
            .armed
            .lock()
            .map_err(|_| StoreError::Fault("fail point registry poisoned".to_string()))?;
        if armed.remove(&point) {
            return Err(StoreError::Fault(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Fault("store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T> {
        let tables = self.lock()?;
        Ok(f(&tables))
    }

    /// Run `f` against a staged copy and commit it only on success
    fn transaction<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut Tables) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut tables = self.lock()?;
        let mut staged = tables.clone();
        match f(&mut staged) {
            Ok(value) => {
                *tables = staged;
                Ok(value)
            }
            Err(e) => {
                warn!("Rolled back {operation}: {e}");
                Err(e)
            }
        }
    }

    fn delete_matches_where(
        &self,
        tables: &mut Tables,
        pred: impl Fn(&Match) -> bool,
    ) -> StoreResult<()> {
        if tables.matches.values().any(&pred) {
            self.trip(FailPoint::MatchDelete)?;
        }
        tables.matches.retain(|_, m| !pred(&*m));
        Ok(())
    }
}

#[async_trait]
impl PlayerRepository for MemoryStore {
    async fn insert_player(&self, player: &NewPlayer) -> StoreResult<Player> {
        self.transaction("insert_player", |t| {
            t.check_player_unique(None, &player.name, player.email.as_deref())?;
            let id = t.next_id();
            let row = PlayerRow {
                id,
                name: player.name.clone(),
                email: player.email.clone(),
                games_won: 0,
                games_lost: 0,
            };
            t.players.insert(id, row.clone());
            Ok(t.player(&row))
        })
    }

    async fn update_player(&self, player: &Player) -> StoreResult<()> {
        self.transaction("update_player", |t| {
            if !t.players.contains_key(&player.id) {
                return Ok(());
            }
            t.check_player_unique(Some(player.id), &player.name, player.email.as_deref())?;
            if let Some(row) = t.players.get_mut(&player.id) {
                row.name = player.name.clone();
                row.email = player.email.clone();
            }

            let previous_seats: HashMap<TournamentId, i32> = t
                .enrollments
                .iter()
                .filter(|e| e.player_id == player.id)
                .map(|e| (e.tournament_id, e.seat))
                .collect();
            t.enrollments.retain(|e| e.player_id != player.id);

            for (&tournament_id, &ranking) in &player.rankings {
                self.trip(FailPoint::EnrollmentInsert)?;
                let seat = match previous_seats.get(&tournament_id) {
                    Some(seat) => *seat,
                    None => t.next_seat(tournament_id),
                };
                t.insert_enrollment(EnrollmentRow {
                    tournament_id,
                    player_id: player.id,
                    ranking,
                    seat,
                })?;
            }
            Ok(())
        })
    }

    async fn delete_player(&self, player_id: PlayerId) -> StoreResult<()> {
        self.transaction("delete_player", |t| {
            self.delete_matches_where(t, |m| m.involves(player_id))?;
            t.enrollments.retain(|e| e.player_id != player_id);
            t.players.remove(&player_id);
            Ok(())
        })
    }

    async fn find_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        self.read(|t| t.players.get(&player_id).map(|row| t.player(row)))
    }

    async fn find_all_players(&self) -> StoreResult<Vec<Player>> {
        self.read(|t| t.players.values().map(|row| t.player(row)).collect())
    }

    async fn find_player_by_name(&self, name: &str) -> StoreResult<Option<Player>> {
        self.read(|t| {
            t.players
                .values()
                .find(|p| p.name == name)
                .map(|row| t.player(row))
        })
    }

    async fn find_player_by_email(&self, email: &str) -> StoreResult<Option<Player>> {
        self.read(|t| {
            t.players
                .values()
                .find(|p| p.email.as_deref() == Some(email))
                .map(|row| t.player(row))
        })
    }

    async fn find_players_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Player>> {
        self.read(|t| {
            t.seats_of(tournament_id)
                .into_iter()
                .filter_map(|e| t.players.get(&e.player_id))
                .map(|row| t.player(row))
                .collect()
        })
    }

    async fn upsert_ranking(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        ranking: i32,
    ) -> StoreResult<()> {
        self.transaction("upsert_ranking", |t| {
            if let Some(row) = t
                .enrollments
                .iter_mut()
                .find(|e| e.player_id == player_id && e.tournament_id == tournament_id)
            {
                row.ranking = ranking;
                return Ok(());
            }
            self.trip(FailPoint::EnrollmentInsert)?;
            let seat = t.next_seat(tournament_id);
            t.insert_enrollment(EnrollmentRow {
                tournament_id,
                player_id,
                ranking,
                seat,
            })
        })
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn insert_tournament(&self, tournament: &NewTournament) -> StoreResult<Tournament> {
        self.transaction("insert_tournament", |t| {
            let id = t.next_id();
            let row = TournamentRow {
                id,
                name: tournament.name.clone(),
                start_date: tournament.start_date,
                end_date: tournament.end_date,
                status: TournamentStatus::Created,
            };
            t.tournaments.insert(id, row.clone());
            for (seat, &player_id) in tournament.player_ids.iter().enumerate() {
                self.trip(FailPoint::EnrollmentInsert)?;
                t.insert_enrollment(EnrollmentRow {
                    tournament_id: id,
                    player_id,
                    ranking: 0,
                    seat: seat as i32,
                })?;
            }
            Ok(t.tournament(&row))
        })
    }

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        self.transaction("update_tournament", |t| {
            let Some(row) = t.tournaments.get_mut(&tournament.id) else {
                return Ok(());
            };
            row.name = tournament.name.clone();
            row.start_date = tournament.start_date;
            row.end_date = tournament.end_date;
            row.status = tournament.status;

            t.enrollments.retain(|e| e.tournament_id != tournament.id);
            for (seat, enrollment) in tournament.enrollments.iter().enumerate() {
                self.trip(FailPoint::EnrollmentInsert)?;
                t.insert_enrollment(EnrollmentRow {
                    tournament_id: tournament.id,
                    player_id: enrollment.player_id,
                    ranking: enrollment.ranking,
                    seat: seat as i32,
                })?;
            }
            Ok(())
        })
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> StoreResult<()> {
        self.transaction("delete_tournament", |t| {
            let round_ids: HashSet<RoundId> = t
                .rounds
                .values()
                .filter(|r| r.tournament_id == tournament_id)
                .map(|r| r.id)
                .collect();
            self.delete_matches_where(t, |m| round_ids.contains(&m.round_id))?;
            t.rounds.retain(|id, _| !round_ids.contains(id));
            t.enrollments.retain(|e| e.tournament_id != tournament_id);
            t.tournaments.remove(&tournament_id);
            Ok(())
        })
    }

    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        self.read(|t| t.tournaments.get(&tournament_id).map(|row| t.tournament(row)))
    }

    async fn find_all_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        self.read(|t| t.tournaments.values().map(|row| t.tournament(row)).collect())
    }

    async fn record_completion(
        &self,
        tournament: &Tournament,
        deltas: &BTreeMap<PlayerId, RecordDelta>,
    ) -> StoreResult<()> {
        self.transaction("record_completion", |t| {
            if let Some(row) = t.tournaments.get_mut(&tournament.id) {
                row.status = tournament.status;
            }
            for (player_id, delta) in deltas {
                self.trip(FailPoint::PlayerStatsUpdate)?;
                if let Some(row) = t.players.get_mut(player_id) {
                    row.games_won += delta.wins;
                    row.games_lost += delta.losses;
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl RoundRepository for MemoryStore {
    async fn insert_round(
        &self,
        tournament_id: TournamentId,
        round: &NewRound,
    ) -> StoreResult<Round> {
        self.transaction("insert_round", |t| {
            if !t.tournaments.contains_key(&tournament_id) {
                return Err(StoreError::Constraint(format!(
                    "rounds.tournament_id {tournament_id} references no tournament"
                )));
            }
            if t.rounds
                .values()
                .any(|r| r.tournament_id == tournament_id && r.round_number == round.round_number)
            {
                return Err(StoreError::Constraint(format!(
                    "round {} already exists in tournament {tournament_id}",
                    round.round_number
                )));
            }

            let round_id = t.next_id();
            let row = RoundRow {
                id: round_id,
                tournament_id,
                round_number: round.round_number,
                completed: false,
            };
            t.rounds.insert(round_id, row.clone());

            for new_match in &round.matches {
                self.trip(FailPoint::MatchInsert)?;
                let match_id = t.next_id();
                t.matches
                    .insert(match_id, new_match.clone().into_match(match_id, round_id));
            }
            Ok(t.round(&row))
        })
    }

    async fn update_round(&self, round: &Round) -> StoreResult<()> {
        self.transaction("update_round", |t| {
            if let Some(row) = t.rounds.get_mut(&round.id) {
                row.round_number = round.round_number;
                row.completed = round.completed;
            }
            Ok(())
        })
    }

    async fn delete_round(&self, round_id: RoundId) -> StoreResult<()> {
        self.transaction("delete_round", |t| {
            self.delete_matches_where(t, |m| m.round_id == round_id)?;
            t.rounds.remove(&round_id);
            Ok(())
        })
    }

    async fn find_round(&self, round_id: RoundId) -> StoreResult<Option<Round>> {
        self.read(|t| t.rounds.get(&round_id).map(|row| t.round(row)))
    }

    async fn find_rounds_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Round>> {
        self.read(|t| t.rounds_of(tournament_id))
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn update_match(&self, m: &Match) -> StoreResult<()> {
        self.transaction("update_match", |t| {
            if let Some(row) = t.matches.get_mut(&m.id) {
                *row = Match {
                    round_id: row.round_id,
                    ..m.clone()
                };
            }
            Ok(())
        })
    }

    async fn delete_match(&self, match_id: MatchId) -> StoreResult<()> {
        self.transaction("delete_match", |t| {
            t.matches.remove(&match_id);
            Ok(())
        })
    }

    async fn find_match(&self, match_id: MatchId) -> StoreResult<Option<Match>> {
        self.read(|t| t.matches.get(&match_id).cloned())
    }

    async fn find_matches_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Match>> {
        self.read(|t| {
            t.matches
                .values()
                .filter(|m| m.round_id == round_id)
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::models::NewMatch;

    async fn store_with_players(names: &[&str]) -> (MemoryStore, Vec<PlayerId>) {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for name in names {
            let player = store
                .insert_player(&NewPlayer::new(*name, None))
                .await
                .expect("insert player");
            ids.push(player.id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn test_insert_and_find_player() {
        let store = MemoryStore::new();
        let player = store
            .insert_player(&NewPlayer::new("Ada", Some("ada@example.com".to_string())))
            .await
            .unwrap();

        assert_eq!(player.games_won, 0);
        assert!(player.rankings.is_empty());
        assert_eq!(store.find_player(player.id).await.unwrap(), Some(player.clone()));
        assert_eq!(
            store.find_player_by_email("ada@example.com").await.unwrap(),
            Some(player.clone())
        );
        assert_eq!(store.find_player_by_name("Ada").await.unwrap(), Some(player));
        assert_eq!(store.find_player_by_name("ada").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_a_constraint_error() {
        let (store, _) = store_with_players(&["Ada"]).await;
        let err = store
            .insert_player(&NewPlayer::new("Ada", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.find_all_players().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tournament_keeps_enrollment_order() {
        let (store, ids) = store_with_players(&["A", "B", "C"]).await;
        let order = vec![ids[2], ids[0], ids[1]];
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, order.clone()))
            .await
            .unwrap();

        assert_eq!(tournament.player_ids().collect::<Vec<_>>(), order);
        let players = store.find_players_by_tournament(tournament.id).await.unwrap();
        assert_eq!(players.iter().map(|p| p.id).collect::<Vec<_>>(), order);
        assert_eq!(players[0].ranking_in(tournament.id), Some(0));
    }

    #[tokio::test]
    async fn test_failed_enrollment_rewrite_rolls_back() {
        let (store, ids) = store_with_players(&["A", "B", "C"]).await;
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, ids.clone()))
            .await
            .unwrap();

        let mut changed = tournament.clone();
        changed.name = "Renamed".to_string();
        changed.enrollments.truncate(1);
        store.fail_on(FailPoint::EnrollmentInsert);

        assert!(store.update_tournament(&changed).await.is_err());
        let reloaded = store.find_tournament(tournament.id).await.unwrap().unwrap();
        assert_eq!(reloaded, tournament);

        // The fail point is one-shot
        store.update_tournament(&changed).await.unwrap();
        let reloaded = store.find_tournament(tournament.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Renamed");
        assert_eq!(reloaded.player_count(), 1);
    }

    #[tokio::test]
    async fn test_round_insert_is_atomic() {
        let (store, ids) = store_with_players(&["A", "B", "C"]).await;
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, ids.clone()))
            .await
            .unwrap();
        let round = NewRound {
            round_number: 1,
            matches: vec![NewMatch::pairing(ids[0], ids[1]), NewMatch::bye(ids[2])],
        };

        store.fail_on(FailPoint::MatchInsert);
        assert!(store.insert_round(tournament.id, &round).await.is_err());
        assert!(store.find_rounds_by_tournament(tournament.id).await.unwrap().is_empty());

        let saved = store.insert_round(tournament.id, &round).await.unwrap();
        assert_eq!(saved.matches.len(), 2);
        assert!(saved.matches.iter().all(|m| m.round_id == saved.id));
        assert_eq!(store.find_matches_by_round(saved.id).await.unwrap(), saved.matches);

        let err = store.insert_round(tournament.id, &round).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_delete_tournament_cascades_but_keeps_players() {
        let (store, ids) = store_with_players(&["A", "B"]).await;
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, ids.clone()))
            .await
            .unwrap();
        let round = store
            .insert_round(
                tournament.id,
                &NewRound {
                    round_number: 1,
                    matches: vec![NewMatch::pairing(ids[0], ids[1])],
                },
            )
            .await
            .unwrap();

        store.delete_tournament(tournament.id).await.unwrap();

        assert!(store.find_tournament(tournament.id).await.unwrap().is_none());
        assert!(store.find_round(round.id).await.unwrap().is_none());
        assert!(store.find_match(round.matches[0].id).await.unwrap().is_none());
        let player = store.find_player(ids[0]).await.unwrap().unwrap();
        assert!(player.rankings.is_empty());
    }

    #[tokio::test]
    async fn test_update_player_preserves_seat_of_existing_enrollments() {
        let (store, ids) = store_with_players(&["A", "B", "C"]).await;
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, ids.clone()))
            .await
            .unwrap();

        let mut first = store.find_player(ids[0]).await.unwrap().unwrap();
        first.rankings.insert(tournament.id, 3);
        store.update_player(&first).await.unwrap();

        let reloaded = store.find_tournament(tournament.id).await.unwrap().unwrap();
        assert_eq!(reloaded.player_ids().collect::<Vec<_>>(), ids);
        assert_eq!(reloaded.ranking_of(ids[0]), Some(3));
    }

    #[tokio::test]
    async fn test_update_player_leaves_counters_alone() {
        let (store, ids) = store_with_players(&["A", "B"]).await;
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, ids.clone()))
            .await
            .unwrap();

        let mut stale = store.find_player(ids[0]).await.unwrap().unwrap();
        store
            .record_completion(
                &tournament,
                &BTreeMap::from([(ids[0], RecordDelta { wins: 2, losses: 1 })]),
            )
            .await
            .unwrap();

        stale.name = "Renamed".to_string();
        stale.games_won = 99;
        store.update_player(&stale).await.unwrap();

        let player = store.find_player(ids[0]).await.unwrap().unwrap();
        assert_eq!(player.name, "Renamed");
        assert_eq!((player.games_won, player.games_lost), (2, 1));
    }

    #[tokio::test]
    async fn test_record_completion_adds_to_counters() {
        let (store, ids) = store_with_players(&["A", "B"]).await;
        let tournament = store
            .insert_tournament(&NewTournament::new("Open", None, None, ids.clone()))
            .await
            .unwrap();
        let delta = BTreeMap::from([(ids[0], RecordDelta { wins: 1, losses: 0 })]);

        store.record_completion(&tournament, &delta).await.unwrap();
        store.record_completion(&tournament, &delta).await.unwrap();

        let player = store.find_player(ids[0]).await.unwrap().unwrap();
        assert_eq!(player.games_won, 2);
    }
}
