//! Persistence boundary for key-management records.
//!
//! Trait-based abstraction over whatever keyed store the platform uses
//! (local encrypted store, server document store). The core never assumes
//! a particular engine. Persistence is the only asynchronous surface in
//! the crate; all cryptography stays CPU-bound and synchronous.

mod error;
mod memory;

use async_trait::async_trait;
pub use error::StoreError;
pub use memory::MemoryKeyStore;

use crate::records::{ConversationKeyRecord, KeyBackupBundle, RotationRecord};

/// Keyed store for conversation key records, rotation logs, and backup
/// bundles.
///
/// Must be Clone (shared across managers and services), Send + Sync, and
/// `'static`. Implementations typically share internal state via Arc, so
/// clones access the same underlying storage.
///
/// # Atomicity
///
/// Every write lands a whole record, bundle, or rotation entry, never a
/// partial one. Callers may be cancelled between calls without leaving a
/// torn write behind.
#[async_trait]
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Load the current key record for a conversation.
    ///
    /// Returns `None` if the conversation has no key.
    async fn load_record(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationKeyRecord>, StoreError>;

    /// Store a key record unconditionally, replacing any current one
    /// (latest-version-wins).
    async fn store_record(&self, record: &ConversationKeyRecord) -> Result<(), StoreError>;

    /// Store a key record only if the current version matches.
    ///
    /// `expected_current == 0` means the conversation must have no record
    /// yet (create-only). This is the compare-and-swap that serializes
    /// racing rotations on one conversation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` when the current version differs
    /// from `expected_current`. Conflicts are transient: re-read and
    /// retry.
    async fn replace_record(
        &self,
        record: &ConversationKeyRecord,
        expected_current: u64,
    ) -> Result<(), StoreError>;

    /// Delete a conversation's current key record.
    ///
    /// Rotation history is retained; it is an append-only audit log.
    async fn delete_record(&self, conversation_id: &str) -> Result<(), StoreError>;

    /// All current key records (backup export).
    ///
    /// Order is not guaranteed.
    async fn list_records(&self) -> Result<Vec<ConversationKeyRecord>, StoreError>;

    /// Append one entry to a conversation's rotation log.
    async fn append_rotation(&self, record: &RotationRecord) -> Result<(), StoreError>;

    /// A conversation's rotation log, ordered by `new_version` ascending.
    ///
    /// Returns an empty list for conversations that never rotated.
    /// Re-readable; entries are never mutated.
    async fn load_rotations(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RotationRecord>, StoreError>;

    /// Store a user's backup bundle, replacing any previous one.
    async fn store_bundle(
        &self,
        user_id: &str,
        bundle: &KeyBackupBundle,
    ) -> Result<(), StoreError>;

    /// Load a user's backup bundle.
    ///
    /// Returns `None` if the user never exported one.
    async fn load_bundle(&self, user_id: &str) -> Result<Option<KeyBackupBundle>, StoreError>;
}
