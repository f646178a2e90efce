//! # Swiss Tournament
//!
//! A Swiss-system tournament engine with transactional persistence.
//!
//! The library tracks players, tournaments, rounds and matches, drives each
//! tournament through its lifecycle and pairs players between rounds by
//! win/loss differential without repeating earlier pairings.
//!
//! ## Architecture
//!
//! - [`pairing`]: ranking and the greedy Swiss pairing pass (pure functions)
//! - [`tournament`]: lifecycle, round creation/completion, statistics, and the
//!   per-tournament lock registry
//! - [`matches`]: the match result processor
//! - [`player`]: player registration, rankings and deletion
//! - [`db`]: the persistence gateway with PostgreSQL and in-memory backends;
//!   every multi-row write is a single transaction
//!
//! All managers share one [`db::Repository`] and one
//! [`tournament::TournamentLocks`], which [`Engine`] wires together.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_tournament::{Engine, db::MemoryStore, tournament::NewTournament};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(Arc::new(MemoryStore::new()));
//!
//!     let mut ids = Vec::new();
//!     for name in ["Ada", "Grace", "Barbara"] {
//!         ids.push(engine.players.create_player(name, None).await?.id);
//!     }
//!
//!     let t = engine
//!         .tournaments
//!         .create_tournament(NewTournament::new("Club Night", None, None, ids))
//!         .await?;
//!     engine.tournaments.start_tournament(t.id).await?;
//!
//!     // Three players: one match and one bye
//!     let round = engine.tournaments.create_next_round(t.id).await?;
//!     assert_eq!(round.matches.len(), 2);
//!     assert_eq!(round.matches.iter().filter(|m| m.is_bye()).count(), 1);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod errors;
pub mod matches;
pub mod pairing;
pub mod player;
pub mod tournament;

use std::sync::Arc;

pub use errors::{Entity, TournamentError, TournamentResult};
pub use matches::{Match, MatchId, MatchManager, MatchStatus};
pub use player::{Player, PlayerId, PlayerManager};
pub use tournament::{Round, RoundId, Tournament, TournamentId, TournamentManager, TournamentStatus};

/// The three managers over one gateway and one lock registry
#[derive(Clone)]
pub struct Engine {
    pub tournaments: TournamentManager,
    pub matches: MatchManager,
    pub players: PlayerManager,
}

impl Engine {
    pub fn new(repo: Arc<dyn db::Repository>) -> Self {
        let locks = tournament::TournamentLocks::new();
        Self {
            tournaments: TournamentManager::new(repo.clone(), locks.clone()),
            matches: MatchManager::new(repo.clone(), locks.clone()),
            players: PlayerManager::new(repo, locks),
        }
    }
}
