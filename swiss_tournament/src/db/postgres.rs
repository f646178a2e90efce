//! PostgreSQL implementation of the persistence gateway.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use log::{debug, warn};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::errors::{StoreError, StoreResult};
use super::repository::{MatchRepository, PlayerRepository, RoundRepository, TournamentRepository};
use crate::matches::models::{Match, MatchId, MatchStatus};
use crate::player::models::{NewPlayer, Player, PlayerId};
use crate::tournament::models::{
    Enrollment, NewRound, NewTournament, Round, RoundId, Tournament, TournamentId,
    TournamentStatus,
};
use crate::tournament::stats::RecordDelta;

/// Gateway backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

/// Map constraint violations onto [`StoreError::Constraint`]
fn map_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Database(err)
}

fn player_row(row: &PgRow, rankings: BTreeMap<TournamentId, i32>) -> Player {
    Player {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        games_won: row.get("games_won"),
        games_lost: row.get("games_lost"),
        rankings,
    }
}

fn match_row(row: &PgRow) -> StoreResult<Match> {
    let status: String = row.get("status");
    Ok(Match {
        id: row.get("id"),
        round_id: row.get("round_id"),
        player1: row.get("player1_id"),
        player2: row.get("player2_id"),
        winner: row.get("winner_id"),
        score_player1: row.get("score_player1"),
        score_player2: row.get("score_player2"),
        status: status.parse::<MatchStatus>().map_err(StoreError::Corrupt)?,
    })
}

const PLAYER_COLUMNS: &str = "id, name, email, games_won, games_lost";
const MATCH_COLUMNS: &str =
    "m.id, m.round_id, m.player1_id, m.player2_id, m.winner_id, m.score_player1, m.score_player2, m.status";

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Enrollment rankings for the given players, keyed by player
    async fn rankings_of(
        &self,
        player_ids: &[PlayerId],
    ) -> StoreResult<HashMap<PlayerId, BTreeMap<TournamentId, i32>>> {
        let rows = sqlx::query(
            r#"
            SELECT player_id, tournament_id, ranking
            FROM tournament_players
            WHERE player_id = ANY($1)
            "#,
        )
        .bind(player_ids)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        let mut rankings: HashMap<PlayerId, BTreeMap<TournamentId, i32>> = HashMap::new();
        for row in rows {
            rankings
                .entry(row.get("player_id"))
                .or_default()
                .insert(row.get("tournament_id"), row.get("ranking"));
        }
        Ok(rankings)
    }

    async fn players_from_rows(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Player>> {
        let ids: Vec<PlayerId> = rows.iter().map(|r| r.get("id")).collect();
        let mut rankings = self.rankings_of(&ids).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let id: PlayerId = row.get("id");
                player_row(row, rankings.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    async fn find_player_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> StoreResult<Option<Player>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE {predicate} = $1"
        ))
        .bind(value)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        match row {
            Some(row) => Ok(self.players_from_rows(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Rounds of a tournament with their matches
    async fn load_rounds(&self, tournament_id: TournamentId) -> StoreResult<Vec<Round>> {
        let round_rows = sqlx::query(
            r#"
            SELECT id, tournament_id, round_number, completed
            FROM rounds
            WHERE tournament_id = $1
            ORDER BY round_number
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        let match_rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS}
             FROM matches m
             JOIN rounds r ON r.id = m.round_id
             WHERE r.tournament_id = $1
             ORDER BY m.id"
        ))
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        let mut by_round: HashMap<RoundId, Vec<Match>> = HashMap::new();
        for row in &match_rows {
            let m = match_row(row)?;
            by_round.entry(m.round_id).or_default().push(m);
        }

        Ok(round_rows
            .iter()
            .map(|row| {
                let id: RoundId = row.get("id");
                Round {
                    id,
                    tournament_id: row.get("tournament_id"),
                    round_number: row.get("round_number"),
                    completed: row.get("completed"),
                    matches: by_round.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn tournament_from_row(&self, row: &PgRow) -> StoreResult<Tournament> {
        let id: TournamentId = row.get("id");
        let status: String = row.get("status");

        let enrollments = sqlx::query(
            r#"
            SELECT player_id, ranking
            FROM tournament_players
            WHERE tournament_id = $1
            ORDER BY seat
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?
        .iter()
        .map(|r| Enrollment {
            player_id: r.get("player_id"),
            ranking: r.get("ranking"),
        })
        .collect();

        Ok(Tournament {
            id,
            name: row.get("name"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            status: status
                .parse::<TournamentStatus>()
                .map_err(StoreError::Corrupt)?,
            enrollments,
            rounds: self.load_rounds(id).await?,
        })
    }

    /// Delete matches selected by `predicate`, which receives `$1`
    async fn delete_matches(
        tx: &mut Transaction<'_, Postgres>,
        predicate: &str,
        id: i64,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM matches WHERE {predicate}"))
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected())
    }

    async fn insert_enrollment(
        tx: &mut Transaction<'_, Postgres>,
        tournament_id: TournamentId,
        player_id: PlayerId,
        ranking: i32,
        seat: Option<i32>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tournament_players (tournament_id, player_id, ranking, seat)
            VALUES ($1, $2, $3, COALESCE($4,
                (SELECT COALESCE(MAX(seat) + 1, 0) FROM tournament_players WHERE tournament_id = $1)))
            "#,
        )
        .bind(tournament_id)
        .bind(player_id)
        .bind(ranking)
        .bind(seat)
        .execute(&mut **tx)
        .await
        .map_err(map_err)?;
        Ok(())
    }
}

#[async_trait]
impl PlayerRepository for PgStore {
    async fn insert_player(&self, player: &NewPlayer) -> StoreResult<Player> {
        let row = sqlx::query(&format!(
            "INSERT INTO players (name, email) VALUES ($1, $2) RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(&player.name)
        .bind(&player.email)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        Ok(player_row(&row, BTreeMap::new()))
    }

    async fn update_player(&self, player: &Player) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query(
            r#"
            UPDATE players
            SET name = $1, email = $2
            WHERE id = $3
            "#,
        )
        .bind(&player.name)
        .bind(&player.email)
        .bind(player.id)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        // Existing enrollments keep their seat
        let seats: HashMap<TournamentId, i32> = sqlx::query(
            "DELETE FROM tournament_players WHERE player_id = $1 RETURNING tournament_id, seat",
        )
        .bind(player.id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_err)?
        .iter()
        .map(|r| (r.get("tournament_id"), r.get("seat")))
        .collect();

        for (&tournament_id, &ranking) in &player.rankings {
            let seat = seats.get(&tournament_id).copied();
            Self::insert_enrollment(&mut tx, tournament_id, player.id, ranking, seat).await?;
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn delete_player(&self, player_id: PlayerId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let removed = Self::delete_matches(
            &mut tx,
            "player1_id = $1 OR player2_id = $1 OR winner_id = $1",
            player_id,
        )
        .await?;
        if removed > 0 {
            debug!("Removing {removed} matches of player {player_id}");
        }

        sqlx::query("DELETE FROM tournament_players WHERE player_id = $1")
            .bind(player_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        sqlx::query("DELETE FROM players WHERE id = $1")
            .bind(player_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn find_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"
        ))
        .bind(player_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        match row {
            Some(row) => Ok(self.players_from_rows(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_all_players(&self) -> StoreResult<Vec<Player>> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY id"
        ))
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;
        self.players_from_rows(rows).await
    }

    async fn find_player_by_name(&self, name: &str) -> StoreResult<Option<Player>> {
        self.find_player_where("name", name).await
    }

    async fn find_player_by_email(&self, email: &str) -> StoreResult<Option<Player>> {
        self.find_player_where("email", email).await
    }

    async fn find_players_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Player>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.email, p.games_won, p.games_lost
            FROM players p
            JOIN tournament_players tp ON tp.player_id = p.id
            WHERE tp.tournament_id = $1
            ORDER BY tp.seat
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;
        self.players_from_rows(rows).await
    }

    async fn upsert_ranking(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        ranking: i32,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let updated = sqlx::query(
            "UPDATE tournament_players SET ranking = $1 WHERE player_id = $2 AND tournament_id = $3",
        )
        .bind(ranking)
        .bind(player_id)
        .bind(tournament_id)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        if updated.rows_affected() == 0 {
            Self::insert_enrollment(&mut tx, tournament_id, player_id, ranking, None).await?;
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }
}

#[async_trait]
impl TournamentRepository for PgStore {
    async fn insert_tournament(&self, tournament: &NewTournament) -> StoreResult<Tournament> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (name, start_date, end_date, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&tournament.name)
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .bind(TournamentStatus::Created.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;
        let id: TournamentId = row.get("id");

        for (seat, &player_id) in tournament.player_ids.iter().enumerate() {
            Self::insert_enrollment(&mut tx, id, player_id, 0, Some(seat as i32)).await?;
        }

        tx.commit().await.map_err(map_err)?;

        Ok(Tournament {
            id,
            name: tournament.name.clone(),
            start_date: tournament.start_date,
            end_date: tournament.end_date,
            status: TournamentStatus::Created,
            enrollments: tournament
                .player_ids
                .iter()
                .map(|&player_id| Enrollment::new(player_id))
                .collect(),
            rounds: Vec::new(),
        })
    }

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query(
            r#"
            UPDATE tournaments
            SET name = $1, start_date = $2, end_date = $3, status = $4
            WHERE id = $5
            "#,
        )
        .bind(&tournament.name)
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .bind(tournament.status.as_str())
        .bind(tournament.id)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        sqlx::query("DELETE FROM tournament_players WHERE tournament_id = $1")
            .bind(tournament.id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        for (seat, enrollment) in tournament.enrollments.iter().enumerate() {
            Self::insert_enrollment(
                &mut tx,
                tournament.id,
                enrollment.player_id,
                enrollment.ranking,
                Some(seat as i32),
            )
            .await?;
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        Self::delete_matches(
            &mut tx,
            "round_id IN (SELECT id FROM rounds WHERE tournament_id = $1)",
            tournament_id,
        )
        .await?;
        for statement in [
            "DELETE FROM rounds WHERE tournament_id = $1",
            "DELETE FROM tournament_players WHERE tournament_id = $1",
            "DELETE FROM tournaments WHERE id = $1",
        ] {
            sqlx::query(statement)
                .bind(tournament_id)
                .execute(&mut *tx)
                .await
                .map_err(map_err)?;
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(
            "SELECT id, name, start_date, end_date, status FROM tournaments WHERE id = $1",
        )
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        match row {
            Some(row) => Ok(Some(self.tournament_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_all_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        let rows = sqlx::query(
            "SELECT id, name, start_date, end_date, status FROM tournaments ORDER BY id",
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;

        let mut tournaments = Vec::with_capacity(rows.len());
        for row in &rows {
            tournaments.push(self.tournament_from_row(row).await?);
        }
        Ok(tournaments)
    }

    async fn record_completion(
        &self,
        tournament: &Tournament,
        deltas: &BTreeMap<PlayerId, RecordDelta>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
            .bind(tournament.status.as_str())
            .bind(tournament.id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        for (player_id, delta) in deltas {
            let updated = sqlx::query(
                r#"
                UPDATE players
                SET games_won = games_won + $1, games_lost = games_lost + $2
                WHERE id = $3
                "#,
            )
            .bind(delta.wins)
            .bind(delta.losses)
            .bind(player_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
            if updated.rows_affected() == 0 {
                warn!(
                    "Player {player_id} vanished while completing tournament {}",
                    tournament.id
                );
            }
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }
}

#[async_trait]
impl RoundRepository for PgStore {
    async fn insert_round(
        &self,
        tournament_id: TournamentId,
        round: &NewRound,
    ) -> StoreResult<Round> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let row = sqlx::query(
            r#"
            INSERT INTO rounds (tournament_id, round_number, completed)
            VALUES ($1, $2, FALSE)
            RETURNING id
            "#,
        )
        .bind(tournament_id)
        .bind(round.round_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;
        let round_id: RoundId = row.get("id");

        let mut matches = Vec::with_capacity(round.matches.len());
        for new_match in &round.matches {
            let row = sqlx::query(
                r#"
                INSERT INTO matches (round_id, player1_id, player2_id, winner_id, status)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(round_id)
            .bind(new_match.player1)
            .bind(new_match.player2)
            .bind(new_match.winner)
            .bind(new_match.status.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_err)?;
            let match_id: MatchId = row.get("id");
            matches.push(new_match.clone().into_match(match_id, round_id));
        }

        tx.commit().await.map_err(map_err)?;

        Ok(Round {
            id: round_id,
            tournament_id,
            round_number: round.round_number,
            completed: false,
            matches,
        })
    }

    async fn update_round(&self, round: &Round) -> StoreResult<()> {
        sqlx::query("UPDATE rounds SET round_number = $1, completed = $2 WHERE id = $3")
            .bind(round.round_number)
            .bind(round.completed)
            .bind(round.id)
            .execute(self.pool.as_ref())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn delete_round(&self, round_id: RoundId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        Self::delete_matches(&mut tx, "round_id = $1", round_id).await?;
        sqlx::query("DELETE FROM rounds WHERE id = $1")
            .bind(round_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn find_round(&self, round_id: RoundId) -> StoreResult<Option<Round>> {
        let Some(row) = sqlx::query(
            "SELECT id, tournament_id, round_number, completed FROM rounds WHERE id = $1",
        )
        .bind(round_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_err)?
        else {
            return Ok(None);
        };

        Ok(Some(Round {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            round_number: row.get("round_number"),
            completed: row.get("completed"),
            matches: self.find_matches_by_round(round_id).await?,
        }))
    }

    async fn find_rounds_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Round>> {
        self.load_rounds(tournament_id).await
    }
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn update_match(&self, m: &Match) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE matches
            SET player1_id = $1, player2_id = $2, winner_id = $3,
                score_player1 = $4, score_player2 = $5, status = $6
            WHERE id = $7
            "#,
        )
        .bind(m.player1)
        .bind(m.player2)
        .bind(m.winner)
        .bind(m.score_player1)
        .bind(m.score_player2)
        .bind(m.status.as_str())
        .bind(m.id)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn delete_match(&self, match_id: MatchId) -> StoreResult<()> {
        sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_match(&self, match_id: MatchId) -> StoreResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches m WHERE m.id = $1"
        ))
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_err)?;
        row.as_ref().map(match_row).transpose()
    }

    async fn find_matches_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches m WHERE m.round_id = $1 ORDER BY m.id"
        ))
        .bind(round_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_err)?;
        rows.iter().map(match_row).collect()
    }
}
