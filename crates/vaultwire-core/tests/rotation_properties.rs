//! Property-based tests for key rotation
//!
//! These tests verify the rotation state machine's invariants:
//!
//! 1. **Monotonicity**: after N rotations the current version is N and
//!    the history holds exactly N entries
//! 2. **Chaining**: each entry's `old_version` equals the previous
//!    entry's `new_version`
//! 3. **Isolation**: every rotation yields a key unrelated to all prior
//!    versions

use std::collections::HashSet;

use proptest::prelude::*;
use vaultwire_core::{ConversationKeyManager, MasterKeyHandle, MemoryKeyStore, RotationReason};
use vaultwire_crypto::MasterKey;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn manager() -> ConversationKeyManager<MemoryKeyStore> {
    let session = MasterKeyHandle::new();
    session.install(MasterKey::from_bytes([0xA5u8; 32]));
    ConversationKeyManager::new(MemoryKeyStore::new(), session)
}

fn nth_secret(n: usize) -> Vec<u8> {
    format!("rotation secret {n}").into_bytes()
}

fn nth_reason(n: usize) -> RotationReason {
    match n % 3 {
        0 => RotationReason::MemberAdded,
        1 => RotationReason::MemberRemoved,
        _ => RotationReason::Manual,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_rotation_is_monotonic_and_chained(rotation_count in 1usize..20) {
        runtime().block_on(async {
            let manager = manager();

            for n in 0..rotation_count {
                let version = manager
                    .rotate_key("conv-1", &nth_secret(n), nth_reason(n))
                    .await
                    .unwrap();
                assert_eq!(version, (n + 1) as u64);
            }

            assert_eq!(
                manager.current_version("conv-1").await.unwrap(),
                rotation_count as u64
            );

            let history = manager.rotation_history("conv-1").await.unwrap();
            assert_eq!(history.len(), rotation_count);

            for (n, entry) in history.iter().enumerate() {
                assert_eq!(entry.old_version, n as u64);
                assert_eq!(entry.new_version, (n + 1) as u64);
                assert_eq!(entry.reason, nth_reason(n));
            }
        });
    }

    #[test]
    fn prop_each_rotation_yields_a_fresh_key(rotation_count in 2usize..12) {
        runtime().block_on(async {
            let manager = manager();
            let mut seen = HashSet::new();

            for n in 0..rotation_count {
                manager
                    .rotate_key("conv-1", &nth_secret(n), RotationReason::Manual)
                    .await
                    .unwrap();

                let key = manager.get_key("conv-1").await.unwrap();
                assert!(seen.insert(key), "rotation produced a previously-seen key");
            }
        });
    }

    #[test]
    fn prop_history_is_rereadable(rotation_count in 1usize..10) {
        runtime().block_on(async {
            let manager = manager();

            for n in 0..rotation_count {
                manager
                    .rotate_key("conv-1", &nth_secret(n), RotationReason::Manual)
                    .await
                    .unwrap();
            }

            let first = manager.rotation_history("conv-1").await.unwrap();
            let second = manager.rotation_history("conv-1").await.unwrap();

            assert_eq!(first, second);
        });
    }
}
