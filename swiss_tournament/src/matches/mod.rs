//! Matches and the result processor.
//!
//! A match moves SCHEDULED → IN_PROGRESS → COMPLETED, or to CANCELLED before
//! it completes. Byes are created already COMPLETED by the pairing engine.

pub mod manager;
pub mod models;

pub use manager::MatchManager;
pub use models::{Match, MatchId, MatchStatus, NewMatch};
