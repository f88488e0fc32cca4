//! Storage error types.
//!
//! Defines errors that can occur at the persistence boundary:
//! - `NotFound`: requested record doesn't exist
//! - `Conflict`: compare-and-swap lost to a concurrent writer
//! - `Serialization`: failed to encode/decode a record
//! - `Io`: underlying storage system errors

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record for the given conversation
    #[error("no record for conversation {conversation_id}")]
    NotFound {
        /// Conversation whose record was missing
        conversation_id: String,
    },

    /// Version compare-and-swap lost to a concurrent writer
    ///
    /// The caller expected the conversation to be at `expected` but it
    /// was at `current`. Transient: re-read the current version and
    /// retry.
    #[error("version conflict: expected {expected}, current {current}")]
    Conflict {
        /// Version the writer expected (0 = no record)
        expected: u64,
        /// Version actually current
        current: u64,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, document store)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only lost compare-and-swaps are transient; the retry re-reads the
    /// new current version and reapplies. Everything else indicates a
    /// broken record or a failing store.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_transient() {
        assert!(StoreError::Conflict { expected: 1, current: 2 }.is_transient());
    }

    #[test]
    fn other_errors_are_fatal() {
        assert!(!StoreError::NotFound { conversation_id: "conv-1".to_string() }.is_transient());
        assert!(!StoreError::Serialization("bad cbor".to_string()).is_transient());
        assert!(!StoreError::Io("disk full".to_string()).is_transient());
    }
}
