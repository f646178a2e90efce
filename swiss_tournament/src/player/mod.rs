//! Players and their cumulative records.

pub mod manager;
pub mod models;

pub use manager::PlayerManager;
pub use models::{NewPlayer, Player, PlayerId};
