//! Message encryption using AES-256-GCM.
//!
//! Every encryption draws a fresh 12-byte IV from the OS CSPRNG. An IV is
//! never reused under the same key. Decryption verifies the 16-byte
//! authentication tag before releasing any plaintext and fails closed on
//! mismatch.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// AES-GCM IV size (12 bytes)
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Symmetric key size (AES-256, 32 bytes)
pub const KEY_SIZE: usize = 32;

/// The uniform encrypted payload shape.
///
/// Used identically for messages, wrapped conversation keys, and wrapped
/// backup bundles. Serializes with base64-encoded fields so transport and
/// storage can move it as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// 12-byte GCM IV, unique per encryption under a given key
    #[serde(with = "wire::fixed")]
    pub iv: [u8; IV_SIZE],
    /// Ciphertext, same length as the plaintext
    #[serde(with = "wire::bytes")]
    pub ciphertext: Vec<u8>,
    /// 16-byte GCM authentication tag
    #[serde(with = "wire::fixed")]
    pub tag: [u8; TAG_SIZE],
}

impl EncryptedPayload {
    /// Plaintext length. GCM ciphertext is the same size; the tag is
    /// carried separately.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Encrypt plaintext under a 256-bit key.
///
/// Generates a fresh CSPRNG IV for this call. The returned payload carries
/// the IV, the ciphertext, and the detached authentication tag.
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> EncryptedPayload {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new(key.into());
    let Ok(mut sealed) = cipher.encrypt(Nonce::from_slice(&iv), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    // The aead API appends the tag to the ciphertext; split it back out
    // into the payload's detached tag field.
    let tag_start = sealed.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&sealed[tag_start..]);
    sealed.truncate(tag_start);

    EncryptedPayload { iv, ciphertext: sealed, tag }
}

/// Decrypt a payload under a 256-bit key.
///
/// # Errors
///
/// - `DecryptionFailure`: authentication tag mismatch (tampering, wrong
///   key, or wrong IV). No plaintext is ever returned on mismatch.
pub fn decrypt(key: &[u8; KEY_SIZE], payload: &EncryptedPayload) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.into());

    let mut sealed = Vec::with_capacity(payload.ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(&payload.ciphertext);
    sealed.extend_from_slice(&payload.tag);

    cipher
        .decrypt(Nonce::from_slice(&payload.iv), sealed.as_slice())
        .map_err(|_| CryptoError::DecryptionFailure)
}

/// Base64 field encoding for the wire/storage shape.
mod wire {
    pub(super) mod bytes {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

        pub(crate) fn serialize<S: Serializer>(
            bytes: &[u8],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&STANDARD.encode(bytes))
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<u8>, D::Error> {
            let encoded = String::deserialize(deserializer)?;
            STANDARD.decode(&encoded).map_err(D::Error::custom)
        }
    }

    pub(super) mod fixed {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

        pub(crate) fn serialize<S: Serializer, const N: usize>(
            bytes: &[u8; N],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&STANDARD.encode(bytes))
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
            deserializer: D,
        ) -> Result<[u8; N], D::Error> {
            let encoded = String::deserialize(deserializer)?;
            let decoded = STANDARD.decode(&encoded).map_err(D::Error::custom)?;
            let actual = decoded.len();
            decoded
                .try_into()
                .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {actual}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"Hello, World!";

        let payload = encrypt(&key, plaintext);
        let decrypted = decrypt(&key, &payload).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_key();

        let payload = encrypt(&key, b"");
        assert_eq!(payload.ciphertext.len(), 0);

        let decrypted = decrypt(&key, &payload).unwrap();
        assert_eq!(decrypted, b"");
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_key();
        let plaintext = vec![0x42u8; 64 * 1024]; // 64KB

        let payload = encrypt(&key, &plaintext);
        let decrypted = decrypt(&key, &payload).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_matches_plaintext_length() {
        let key = test_key();
        let plaintext = b"test message";

        let payload = encrypt(&key, plaintext);

        assert_eq!(payload.ciphertext.len(), plaintext.len());
        assert_eq!(payload.plaintext_len(), plaintext.len());
    }

    #[test]
    fn fresh_iv_per_call() {
        let key = test_key();
        let plaintext = b"same message";

        let payload1 = encrypt(&key, plaintext);
        let payload2 = encrypt(&key, plaintext);

        assert_ne!(payload1.iv, payload2.iv);
        // Different IVs mean different ciphertext for the same plaintext
        assert_ne!(payload1.ciphertext, payload2.ciphertext);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let key = test_key();
        let payload = encrypt(&key, b"secret message");

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;

        let result = decrypt(&wrong_key, &payload);
        assert_eq!(result, Err(CryptoError::DecryptionFailure));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = test_key();
        let mut payload = encrypt(&key, b"original message");

        payload.ciphertext[0] ^= 0x01;

        assert_eq!(decrypt(&key, &payload), Err(CryptoError::DecryptionFailure));
    }

    #[test]
    fn tampered_tag_fails_decryption() {
        let key = test_key();
        let mut payload = encrypt(&key, b"original message");

        payload.tag[15] ^= 0x01;

        assert_eq!(decrypt(&key, &payload), Err(CryptoError::DecryptionFailure));
    }

    #[test]
    fn tampered_iv_fails_decryption() {
        let key = test_key();
        let mut payload = encrypt(&key, b"original message");

        payload.iv[0] ^= 0x01;

        assert_eq!(decrypt(&key, &payload), Err(CryptoError::DecryptionFailure));
    }

    #[test]
    fn decrypt_is_idempotent() {
        // At-least-once transport delivery means the same payload may be
        // decrypted more than once. Fixed (key, IV, ciphertext) always
        // yields the same plaintext.
        let key = test_key();
        let payload = encrypt(&key, b"delivered twice");

        let first = decrypt(&key, &payload).unwrap();
        let second = decrypt(&key, &payload).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn wire_shape_uses_base64_fields() {
        let key = test_key();
        let payload = encrypt(&key, b"wire test");

        let json = serde_json::to_value(&payload).unwrap();

        assert!(json["iv"].is_string());
        assert!(json["ciphertext"].is_string());
        assert!(json["tag"].is_string());

        let roundtripped: EncryptedPayload = serde_json::from_value(json).unwrap();
        assert_eq!(roundtripped, payload);
    }

    #[test]
    fn wire_shape_rejects_wrong_iv_length() {
        // 8 bytes of IV instead of 12
        let json = r#"{"iv":"AAAAAAAAAAA=","ciphertext":"","tag":"AAAAAAAAAAAAAAAAAAAAAA=="}"#;
        let result: Result<EncryptedPayload, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn wire_shape_rejects_invalid_base64() {
        let json = r#"{"iv":"!!!not-base64!!!","ciphertext":"","tag":"AAAAAAAAAAAAAAAAAAAAAA=="}"#;
        let result: Result<EncryptedPayload, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
