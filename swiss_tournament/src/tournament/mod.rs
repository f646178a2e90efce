//! Tournament lifecycle, rounds and statistics.
//!
//! A tournament moves CREATED → IN_PROGRESS → COMPLETED, or to CANCELLED from
//! either non-terminal state. Rounds are appended by the pairing engine and
//! completed once all their matches are; completing the tournament credits
//! every enrolled player's wins and losses.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_tournament::db::MemoryStore;
//! use swiss_tournament::player::NewPlayer;
//! use swiss_tournament::tournament::{NewTournament, TournamentLocks, TournamentManager};
//! use swiss_tournament::db::PlayerRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let a = store.insert_player(&NewPlayer::new("Ada", None)).await?;
//!     let b = store.insert_player(&NewPlayer::new("Grace", None)).await?;
//!
//!     let manager = TournamentManager::new(store, TournamentLocks::new());
//!     let tournament = manager
//!         .create_tournament(NewTournament::new("Spring Open", None, None, vec![a.id, b.id]))
//!         .await?;
//!     manager.start_tournament(tournament.id).await?;
//!
//!     let round = manager.create_next_round(tournament.id).await?;
//!     assert_eq!(round.round_number, 1);
//!     assert_eq!(round.matches.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod locks;
pub mod manager;
pub mod models;
pub mod rounds;
pub mod stats;

pub use locks::TournamentLocks;
pub use manager::{MIN_PLAYERS_TO_START, TournamentManager};
pub use models::{
    Enrollment, NewRound, NewTournament, Round, RoundId, Tournament, TournamentId,
    TournamentStatus,
};
pub use stats::RecordDelta;
