//! Property-based tests for the cryptographic primitives
//!
//! These tests verify the fundamental invariants of the primitive layer:
//!
//! 1. **Round-trip**: decrypt(encrypt(m)) == m for all keys and messages
//! 2. **Tamper detection**: any bit flip in ciphertext or tag fails closed
//! 3. **Determinism**: conversation-key derivation is stable across calls
//! 4. **Isolation**: different versions/conversations produce different keys
//! 5. **Symmetry**: both sides of an exchange compute the same secret

use std::collections::HashSet;

use proptest::prelude::*;
use vaultwire_crypto::{
    IdentityKeyPair, decrypt, derive_conversation_key, derive_shared_secret, encrypt, unwrap_key,
    wrap_key,
};

fn key_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::collection::vec(any::<u8>(), 32..=32).prop_map(|v| {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&v);
        arr
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        key in key_strategy(),
        plaintext in prop::collection::vec(any::<u8>(), 0..1000),
    ) {
        let payload = encrypt(&key, &plaintext);
        let decrypted = decrypt(&key, &payload).unwrap();

        prop_assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn prop_tampered_ciphertext_fails_closed(
        key in key_strategy(),
        plaintext in prop::collection::vec(any::<u8>(), 1..500),
        byte_index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut payload = encrypt(&key, &plaintext);

        let index = byte_index.index(payload.ciphertext.len());
        payload.ciphertext[index] ^= 1 << bit;

        prop_assert!(decrypt(&key, &payload).is_err());
    }

    #[test]
    fn prop_tampered_tag_fails_closed(
        key in key_strategy(),
        plaintext in prop::collection::vec(any::<u8>(), 0..500),
        tag_index in 0usize..16,
        bit in 0u8..8,
    ) {
        let mut payload = encrypt(&key, &plaintext);
        payload.tag[tag_index] ^= 1 << bit;

        prop_assert!(decrypt(&key, &payload).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_derivation_deterministic(
        secret in prop::collection::vec(any::<u8>(), 1..100),
        conversation_id in "[a-z0-9-]{1,32}",
        version in 1u64..1000,
    ) {
        let key1 = derive_conversation_key(&secret, &conversation_id, version);
        let key2 = derive_conversation_key(&secret, &conversation_id, version);

        prop_assert_eq!(key1, key2);
    }

    #[test]
    fn prop_different_versions_different_keys(
        secret in prop::collection::vec(any::<u8>(), 32..=32),
        conversation_id in "[a-z0-9-]{1,32}",
        version1 in 1u64..1000,
        version2 in 1u64..1000,
    ) {
        prop_assume!(version1 != version2);

        let key1 = derive_conversation_key(&secret, &conversation_id, version1);
        let key2 = derive_conversation_key(&secret, &conversation_id, version2);

        prop_assert_ne!(key1, key2);
    }

    #[test]
    fn prop_wrap_unwrap_roundtrip(
        key in key_strategy(),
        wrapping_key in key_strategy(),
    ) {
        let wrapped = wrap_key(&key, &wrapping_key);
        let unwrapped = unwrap_key(&wrapped, &wrapping_key).unwrap();

        prop_assert_eq!(unwrapped, key);
    }

    #[test]
    fn prop_unwrap_with_wrong_key_fails(
        key in key_strategy(),
        wrapping_key in key_strategy(),
        other_key in key_strategy(),
    ) {
        prop_assume!(wrapping_key != other_key);

        let wrapped = wrap_key(&key, &wrapping_key);
        prop_assert!(unwrap_key(&wrapped, &other_key).is_err());
    }
}

#[test]
fn shared_secret_symmetry_across_many_pairs() {
    for _ in 0..32 {
        let a = IdentityKeyPair::generate("alice", "phone");
        let b = IdentityKeyPair::generate("bob", "laptop");

        let secret_a = derive_shared_secret(&a.private_key(), &b.public_key()).unwrap();
        let secret_b = derive_shared_secret(&b.private_key(), &a.public_key()).unwrap();

        assert_eq!(secret_a, secret_b);
    }
}

#[test]
fn iv_unique_across_ten_thousand_encryptions() {
    let key = [0x5Au8; 32];
    let mut seen = HashSet::with_capacity(10_000);

    for _ in 0..10_000 {
        let payload = encrypt(&key, b"iv uniqueness probe");
        assert!(seen.insert(payload.iv), "IV reused under the same key");
    }
}
