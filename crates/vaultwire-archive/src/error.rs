//! Error types for the archive-recovery path.
//!
//! Export-level failures (missing mirror key, operator password
//! rejected) abort the whole export. Per-message decryption failures do
//! not; those are recorded inside the report, not raised here.

use thiserror::Error;
use vaultwire_core::StoreError;
use vaultwire_crypto::CryptoError;

/// Errors that abort an archive operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The mirror holds no wrapped key for the conversation
    #[error("no mirrored key for conversation {conversation_id}")]
    MissingKey {
        /// Conversation whose mirror record was missing
        conversation_id: String,
    },

    /// The mirrored conversation key did not unwrap
    ///
    /// Wrong operator password or a corrupted mirror record. The whole
    /// export fails: without the conversation key nothing in range can
    /// be decrypted.
    #[error("operator key rejected: mirrored key tag mismatch")]
    AuthenticationFailure,

    /// Operator password derivation rejected its inputs
    #[error("operator key derivation failed: {reason}")]
    DerivationFailure {
        /// What the KDF rejected
        reason: String,
    },

    /// A mirrored key unwrapped to something that is not a key
    #[error("invalid mirrored key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was found
        actual: usize,
    },

    /// Mirror store or message archive failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CryptoError> for ArchiveError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKeyLength { expected, actual } => {
                Self::InvalidKeyLength { expected, actual }
            },
            CryptoError::AuthenticationFailure | CryptoError::DecryptionFailure => {
                Self::AuthenticationFailure
            },
            CryptoError::DerivationFailure { reason } => Self::DerivationFailure { reason },
        }
    }
}
