//! Error types for cryptographic primitives.
//!
//! Every failure is a typed result surfaced to the caller. A tag mismatch
//! does not reveal whether the key was wrong or the data was tampered
//! with.

use thiserror::Error;

/// Errors from the primitive layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A key or public key had the wrong length
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was provided
        actual: usize,
    },

    /// Authentication tag did not verify when unwrapping a key
    ///
    /// Either the wrapping key is wrong or the wrapped record was
    /// tampered with; the two cases are indistinguishable.
    #[error("authentication failure: wrapped key tag mismatch")]
    AuthenticationFailure,

    /// Message decryption failed closed
    ///
    /// Tag verification happens before any plaintext is released. There
    /// is no partial or best-effort decrypt.
    #[error("decryption failed: ciphertext authentication tag mismatch")]
    DecryptionFailure,

    /// Password-based key derivation rejected its inputs
    #[error("key derivation failed: {reason}")]
    DerivationFailure {
        /// What the KDF rejected
        reason: String,
    },
}
