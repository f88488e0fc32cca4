//! Error types for key-management operations.
//!
//! Strongly-typed errors for the failure modes callers must distinguish:
//! a missing key (show a placeholder, don't retry), an authentication
//! failure (never retryable without new input), a wrong backup password,
//! and transient store conflicts (retryable).

use thiserror::Error;
use vaultwire_crypto::CryptoError;

use crate::store::StoreError;

/// Errors that can occur during key-management operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// No conversation key record, or the session master key is not set
    ///
    /// UI-facing callers render a placeholder for the affected message
    /// and must not retry automatically.
    #[error("missing key: {context}")]
    MissingKey {
        /// What was missing (conversation key, master key, bundle)
        context: String,
    },

    /// Wrapped-key authentication tag mismatch
    ///
    /// Wrong master key or a corrupted record. Cannot succeed on retry
    /// without new input.
    #[error("authentication failure: wrapped key tag mismatch")]
    AuthenticationFailure,

    /// Message-level decryption failed closed
    #[error("decryption failed: ciphertext authentication tag mismatch")]
    DecryptionFailure,

    /// Backup bundle did not unwrap with the supplied password
    #[error("wrong backup password")]
    WrongPassword,

    /// Backup bundle is malformed or from an unsupported format version
    #[error("backup bundle corrupt: {reason}")]
    BackupCorrupt {
        /// What failed to parse or verify
        reason: String,
    },

    /// Password-based key derivation rejected its inputs
    #[error("key derivation failed: {reason}")]
    DerivationFailure {
        /// What the KDF rejected
        reason: String,
    },

    /// A key or public key had the wrong length
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was provided
        actual: usize,
    },

    /// Persistence-boundary failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl KeyError {
    /// Convenience constructor for the missing-key case.
    pub(crate) fn missing(context: impl Into<String>) -> Self {
        Self::MissingKey { context: context.into() }
    }
}

impl From<CryptoError> for KeyError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKeyLength { expected, actual } => {
                Self::InvalidKeyLength { expected, actual }
            },
            CryptoError::AuthenticationFailure => Self::AuthenticationFailure,
            CryptoError::DecryptionFailure => Self::DecryptionFailure,
            CryptoError::DerivationFailure { reason } => Self::DerivationFailure { reason },
        }
    }
}
