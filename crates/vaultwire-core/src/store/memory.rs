#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::{KeyStore, StoreError};
use crate::records::{ConversationKeyRecord, KeyBackupBundle, RotationRecord};

/// In-memory store implementation for testing and simulation
///
/// Uses `HashMap` keyed by conversation/user id. All state is wrapped in
/// Arc<Mutex<>> to allow Clone and concurrent access. Thread-safe through
/// Mutex, but uses `lock().expect()` which will panic if the mutex is
/// poisoned - acceptable for test code. No lock is ever held across an
/// await point.
#[derive(Clone)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<MemoryKeyStoreInner>>,
}

struct MemoryKeyStoreInner {
    /// Current key record per conversation
    records: HashMap<String, ConversationKeyRecord>,

    /// Rotation log per conversation, in append order
    rotations: HashMap<String, Vec<RotationRecord>>,

    /// Backup bundle per user
    bundles: HashMap<String, KeyBackupBundle>,
}

impl MemoryKeyStore {
    /// Create a new empty `MemoryKeyStore`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryKeyStoreInner {
                records: HashMap::new(),
                rotations: HashMap::new(),
                bundles: HashMap::new(),
            })),
        }
    }

    /// Number of conversations with a current key record.
    ///
    /// Useful for debugging and testing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/simulation code.
    #[allow(clippy::expect_used)]
    pub fn record_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").records.len()
    }

    /// Total rotation entries across all conversations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test/simulation code.
    #[allow(clippy::expect_used)]
    pub fn rotation_count(&self) -> usize {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.rotations.values().map(std::vec::Vec::len).sum()
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn load_record(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationKeyRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner.records.get(conversation_id).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn store_record(&self, record: &ConversationKeyRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .records
            .insert(record.conversation_id.clone(), record.clone());

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn replace_record(
        &self,
        record: &ConversationKeyRecord,
        expected_current: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let current = inner.records.get(&record.conversation_id).map_or(0, |r| r.version);

        if current != expected_current {
            return Err(StoreError::Conflict { expected: expected_current, current });
        }

        inner.records.insert(record.conversation_id.clone(), record.clone());

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn delete_record(&self, conversation_id: &str) -> Result<(), StoreError> {
        self.inner.lock().expect("Mutex poisoned").records.remove(conversation_id);

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn list_records(&self) -> Result<Vec<ConversationKeyRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner.records.values().cloned().collect())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn append_rotation(&self, record: &RotationRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .rotations
            .entry(record.conversation_id.clone())
            .or_default()
            .push(record.clone());

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn load_rotations(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RotationRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let mut rotations = inner.rotations.get(conversation_id).cloned().unwrap_or_default();
        rotations.sort_by_key(|r| r.new_version);

        Ok(rotations)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn store_bundle(
        &self,
        user_id: &str,
        bundle: &KeyBackupBundle,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .bundles
            .insert(user_id.to_string(), bundle.clone());

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn load_bundle(&self, user_id: &str) -> Result<Option<KeyBackupBundle>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner.bundles.get(user_id).cloned())
    }
}
