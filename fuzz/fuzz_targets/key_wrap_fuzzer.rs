//! Fuzz target for key wrapping and message decryption
//!
//! Tests the AEAD surfaces under adversarial inputs.
//!
//! # Strategy
//!
//! - Arbitrary keys, plaintexts, and conversation identifiers
//! - Decryption of arbitrary (never-encrypted) payloads
//! - Bit flips in IV, ciphertext, and tag of valid payloads
//! - Unwrapping payloads that never held a key
//!
//! # Invariants
//!
//! - Encrypt/decrypt roundtrip succeeds under the right key
//! - Corrupted payloads fail decryption, never panic
//! - Conversation-key derivation is deterministic
//! - unwrap_key on garbage returns an error, never a panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vaultwire_crypto::{
    EncryptedPayload, decrypt, derive_conversation_key, encrypt, unwrap_key, wrap_key,
};

#[derive(Debug, Clone, Arbitrary)]
struct WrapScenario {
    /// Key under test
    key: [u8; 32],
    /// Wrapping key
    wrapping_key: [u8; 32],
    /// Message plaintext
    plaintext: Vec<u8>,
    /// Shared secret for derivation
    shared_secret: Vec<u8>,
    /// Conversation identifier
    conversation_id: String,
    /// Key version
    version: u64,
    /// Arbitrary bytes interpreted as a hostile payload
    hostile_iv: [u8; 12],
    /// Hostile ciphertext
    hostile_ciphertext: Vec<u8>,
    /// Hostile tag
    hostile_tag: [u8; 16],
    /// Corruption site for the valid payload
    corrupt_index: usize,
}

fuzz_target!(|scenario: WrapScenario| {
    // Derivation is deterministic and total
    let derived =
        derive_conversation_key(&scenario.shared_secret, &scenario.conversation_id, scenario.version);
    let again =
        derive_conversation_key(&scenario.shared_secret, &scenario.conversation_id, scenario.version);
    assert_eq!(derived, again);

    // Roundtrip under the right key
    let payload = encrypt(&scenario.key, &scenario.plaintext);
    let decrypted = decrypt(&scenario.key, &payload).expect("roundtrip under the right key");
    assert_eq!(decrypted, scenario.plaintext);

    // Corrupt one ciphertext byte: must fail, never panic
    if !payload.ciphertext.is_empty() {
        let mut corrupted = payload.clone();
        let index = scenario.corrupt_index % corrupted.ciphertext.len();
        corrupted.ciphertext[index] ^= 0x01;
        assert!(decrypt(&scenario.key, &corrupted).is_err());
    }

    // Hostile payload that was never produced by encrypt
    let hostile = EncryptedPayload {
        iv: scenario.hostile_iv,
        ciphertext: scenario.hostile_ciphertext.clone(),
        tag: scenario.hostile_tag,
    };
    let _ = decrypt(&scenario.key, &hostile);
    let _ = unwrap_key(&hostile, &scenario.wrapping_key);

    // Wrap/unwrap roundtrip
    let wrapped = wrap_key(&scenario.key, &scenario.wrapping_key);
    let unwrapped = unwrap_key(&wrapped, &scenario.wrapping_key).expect("unwrap under the right key");
    assert_eq!(unwrapped, scenario.key);
});
