use thiserror::Error;

/// Errors that can arise while operating on the game storage layer or
/// violating an engine invariant. Engine operations translate every storage
/// failure into this taxonomy; a raw sled error never crosses the API
/// boundary untyped.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// An operation was attempted against a record in the wrong state
    /// (tier mismatch on merge, quest not completed, already claimed, ...).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A concurrent mutation won the race. Distinct from `InvalidState` so
    /// callers can retry the operation once before surfacing it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input such as non-positive amounts or an empty name.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Insufficient balance for a debit. Callers must check before committing
    /// a purchase.
    #[error("insufficient funds")]
    InsufficientFunds,
}

impl GameError {
    /// True when the caller may safely retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(GameError::Conflict("lost the race".to_string()).is_retryable());
        assert!(!GameError::NotFound("player: alice".to_string()).is_retryable());
        assert!(!GameError::InvalidState("already claimed".to_string()).is_retryable());
        assert!(!GameError::InsufficientFunds.is_retryable());
    }
}
