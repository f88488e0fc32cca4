//! Key wrapping: encrypting one key under another.
//!
//! Single implementation shared by the client-side key store, the backup
//! bundle, and the server-side archive mirror. A wrapped key is an
//! ordinary [`EncryptedPayload`] whose plaintext is exactly 32 bytes.

use zeroize::Zeroize;

use crate::{
    cipher::{self, EncryptedPayload, KEY_SIZE},
    error::CryptoError,
};

/// Wrap a 256-bit key under a wrapping key.
///
/// Uses AES-256-GCM with a fresh IV, so wrapping the same key twice
/// produces different payloads.
pub fn wrap_key(key: &[u8; KEY_SIZE], wrapping_key: &[u8; KEY_SIZE]) -> EncryptedPayload {
    cipher::encrypt(wrapping_key, key)
}

/// Unwrap a key previously wrapped with [`wrap_key`].
///
/// # Errors
///
/// - `AuthenticationFailure`: tag mismatch, wrong wrapping key or
///   tampered record
/// - `InvalidKeyLength`: the payload authenticated but its plaintext is
///   not a 32-byte key (a foreign payload wrapped under the same key)
pub fn unwrap_key(
    wrapped: &EncryptedPayload,
    wrapping_key: &[u8; KEY_SIZE],
) -> Result<[u8; KEY_SIZE], CryptoError> {
    let mut plaintext = cipher::decrypt(wrapping_key, wrapped)
        .map_err(|_| CryptoError::AuthenticationFailure)?;

    if plaintext.len() != KEY_SIZE {
        let actual = plaintext.len();
        plaintext.zeroize();
        return Err(CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual });
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&plaintext);
    plaintext.zeroize();

    Ok(key)
}
