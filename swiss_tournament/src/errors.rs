//! Error types shared by every manager in the crate.

use crate::db::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Player,
    Tournament,
    Round,
    Match,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Player => write!(f, "Player"),
            Entity::Tournament => write!(f, "Tournament"),
            Entity::Round => write!(f, "Round"),
            Entity::Match => write!(f, "Match"),
        }
    }
}

/// Tournament engine errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Lookup by id failed
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// A lifecycle precondition was violated; nothing was written
    #[error("Invalid state transition for {entity} {id}: {reason}")]
    InvalidStateTransition {
        entity: Entity,
        id: i64,
        reason: String,
    },

    /// Input rejected before any write
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The enclosing transaction was rolled back
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl TournamentError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid_transition(entity: Entity, id: i64, reason: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            entity,
            id,
            reason: reason.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Get a client-safe error message
    ///
    /// Persistence errors are collapsed so SQL details never reach an operator
    /// screen; every other kind is already phrased for the caller.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Persistence(_) => "Internal storage error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for TournamentError {
    fn from(err: sqlx::Error) -> Self {
        TournamentError::Persistence(StoreError::Database(err))
    }
}

/// Result type for engine operations
pub type TournamentResult<T> = Result<T, TournamentError>;
