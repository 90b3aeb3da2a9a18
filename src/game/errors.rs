use serde::Serialize;
use thiserror::Error;

/// Errors raised by the game core and its sled-backed store.
#[derive(Debug, Error)]
pub enum GameError {
    /// Unknown (or malformed) session id, or an unknown character.
    #[error("not found: {0}")]
    NotFound(String),

    /// Action or direction outside the recognized set.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Movement attempted while a monster is still standing.
    #[error("a battle is in progress")]
    CombatInProgress,

    /// Attack or block attempted with no monster present.
    #[error("there is no active battle")]
    NoActiveCombat,

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Unexpected storage conditions (aborted transactions and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Tag reported to clients alongside the human-readable reason.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidAction,
    CombatInProgress,
    NoActiveCombat,
    Persistence,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::NotFound(_) => ErrorKind::NotFound,
            GameError::InvalidAction(_) => ErrorKind::InvalidAction,
            GameError::CombatInProgress => ErrorKind::CombatInProgress,
            GameError::NoActiveCombat => ErrorKind::NoActiveCombat,
            GameError::Sled(_)
            | GameError::Bincode(_)
            | GameError::Io(_)
            | GameError::SchemaMismatch { .. }
            | GameError::Internal(_) => ErrorKind::Persistence,
        }
    }

    /// Storage failures abort the request; everything else is a reported, non-fatal outcome.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }

    /// Reason string shown to players. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GameError::NotFound(what) if what.starts_with("session") => {
                "Session not found. Start a new session.".to_string()
            }
            GameError::NotFound(what) => format!("Not found: {}.", what),
            GameError::InvalidAction(reason) => format!("Invalid action: {}.", reason),
            GameError::CombatInProgress => {
                "A monster blocks the way! Finish the battle before moving.".to_string()
            }
            GameError::NoActiveCombat => {
                "There is no monster to fight. Explore to find one.".to_string()
            }
            _ => "Storage unavailable, please try again.".to_string(),
        }
    }
}

impl From<sled::transaction::TransactionError<()>> for GameError {
    fn from(err: sled::transaction::TransactionError<()>) -> Self {
        match err {
            sled::transaction::TransactionError::Storage(e) => GameError::Sled(e),
            sled::transaction::TransactionError::Abort(()) => {
                GameError::Internal("transaction aborted".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_failures_are_fatal() {
        assert!(!GameError::NotFound("session: x".into()).is_fatal());
        assert!(!GameError::InvalidAction("dance".into()).is_fatal());
        assert!(!GameError::CombatInProgress.is_fatal());
        assert!(!GameError::NoActiveCombat.is_fatal());
        assert!(GameError::Internal("boom".into()).is_fatal());
        let schema = GameError::SchemaMismatch {
            entity: "session",
            expected: 1,
            found: 9,
        };
        assert_eq!(schema.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn storage_details_are_not_shown_to_players() {
        let err = GameError::Internal("disk on fire".into());
        assert!(!err.public_message().contains("disk"));
        let missing = GameError::NotFound("session: abc".into());
        assert!(missing.public_message().contains("Session not found"));
    }
}
