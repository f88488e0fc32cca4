//! Conversation-key derivation using HKDF.

use hkdf::Hkdf;
use sha2::Sha256;

/// Label used for conversation key derivation
const CONVERSATION_KEY_LABEL: &[u8] = b"vaultwireConvKeyV1";

/// Derive a 256-bit conversation key from a shared secret.
///
/// HKDF-SHA256 with info = label || `conversation_id` || version. Both
/// parties of an exchange reach the same key from the same shared secret
/// without ever transmitting it.
///
/// # Security
///
/// - Deterministic: same inputs always produce same output
/// - Distinct versions produce distinct, unrelated keys (rotation
///   boundary)
/// - Distinct conversations produce distinct keys from the same secret
pub fn derive_conversation_key(
    shared_secret: &[u8],
    conversation_id: &str,
    version: u64,
) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);

    let id_bytes = conversation_id.as_bytes();
    let mut info = Vec::with_capacity(CONVERSATION_KEY_LABEL.len() + id_bytes.len() + 8);
    info.extend_from_slice(CONVERSATION_KEY_LABEL);
    info.extend_from_slice(id_bytes);
    info.extend_from_slice(&version.to_be_bytes());

    let mut key = [0u8; 32];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    key
}
