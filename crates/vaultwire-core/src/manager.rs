//! Conversation key manager.
//!
//! Owns the lifecycle of per-conversation symmetric keys: derivation from
//! a shared secret, wrapping under the session master key, persistence as
//! the single current record, and rotation on membership change.
//!
//! ## Architecture
//!
//! ```text
//! KeyExchangeEngine (X25519)
//!        │ shared secret
//!        ▼
//! ConversationKeyManager ← THIS MODULE
//!        │ wraps under MasterKeyHandle, persists via KeyStore
//!        ▼
//! MessageCipher (AES-256-GCM)
//! ```
//!
//! ## Concurrency
//!
//! Reads run concurrently without restriction. Rotation is serialized per
//! conversation by an optimistic compare-and-swap on the record version:
//! two racing rotations (simultaneous add and remove) cannot silently
//! diverge; the loser re-reads the new current version and reapplies.
//! Conversations are fully independent of each other.

use zeroize::Zeroize;

use vaultwire_crypto::derive_conversation_key;

use crate::{
    error::KeyError,
    records::{ConversationKeyRecord, RotationReason, RotationRecord, unix_now_secs},
    session::MasterKeyHandle,
    store::{KeyStore, StoreError},
};

/// Derives, wraps, persists, and rotates per-conversation symmetric keys.
///
/// Generic over the persistence boundary; the manager never assumes a
/// particular storage engine.
pub struct ConversationKeyManager<S: KeyStore> {
    store: S,
    session: MasterKeyHandle,
}

impl<S: KeyStore> ConversationKeyManager<S> {
    /// Create a manager over a store and a session key context.
    pub fn new(store: S, session: MasterKeyHandle) -> Self {
        Self { store, session }
    }

    /// Establish version 1 of a conversation's key from a shared secret.
    ///
    /// The first-key-exchange path: both parties derive the identical key
    /// independently; each persists its own wrapped copy. Create-only: a
    /// conversation that already has a key must rotate instead.
    ///
    /// Returns the derived key for immediate use.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the session is locked
    /// - `Store(Conflict)` if the conversation already has a key
    pub async fn establish_key(
        &self,
        conversation_id: &str,
        shared_secret: &[u8],
    ) -> Result<[u8; 32], KeyError> {
        let key = derive_conversation_key(shared_secret, conversation_id, 1);
        let wrapped = self.wrap(&key)?;

        let record = ConversationKeyRecord {
            conversation_id: conversation_id.to_string(),
            version: 1,
            wrapped_key: wrapped,
            created_at_secs: unix_now_secs(),
            rotated_at_secs: None,
        };

        self.store.replace_record(&record, 0).await?;

        tracing::debug!(conversation_id, version = 1, "conversation key established");

        Ok(key)
    }

    /// Wrap a key under the session master key and persist it as the
    /// conversation's single current record (latest-version-wins).
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the session is locked
    pub async fn store_key(
        &self,
        conversation_id: &str,
        key: &[u8; 32],
        version: u64,
    ) -> Result<(), KeyError> {
        let wrapped = self.wrap(key)?;

        let record = ConversationKeyRecord {
            conversation_id: conversation_id.to_string(),
            version,
            wrapped_key: wrapped,
            created_at_secs: unix_now_secs(),
            rotated_at_secs: None,
        };

        self.store.store_record(&record).await?;

        Ok(())
    }

    /// Unwrap and return the conversation's current key.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the conversation has no record or the session is
    ///   locked
    /// - `AuthenticationFailure` if the wrapped key's tag does not verify
    ///   (wrong master key or corrupted record)
    pub async fn get_key(&self, conversation_id: &str) -> Result<[u8; 32], KeyError> {
        let record = self
            .store
            .load_record(conversation_id)
            .await?
            .ok_or_else(|| KeyError::missing(format!("no conversation key for {conversation_id}")))?;

        self.unwrap(&record.wrapped_key)
    }

    /// Current key version for a conversation. 0 if no key exists.
    pub async fn current_version(&self, conversation_id: &str) -> Result<u64, KeyError> {
        Ok(self.store.load_record(conversation_id).await?.map_or(0, |r| r.version))
    }

    /// Rotate the conversation to a new key version.
    ///
    /// Reads the current version v (0 if absent), derives v+1 from the new
    /// shared secret, stores it with a compare-and-swap on v, and appends
    /// a [`RotationRecord`]. A lost swap re-reads and retries: the shared
    /// secret still reflects the requested membership change, so
    /// reapplying on top of the winner is correct.
    ///
    /// Policy: `MemberRemoved` rotations are mandatory (forward secrecy);
    /// `MemberAdded` rotations keep prior history off the new key;
    /// `Manual` rotations are allowed at any time. The manager applies
    /// whichever reason the membership notifier hands it.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the session is locked
    pub async fn rotate_key(
        &self,
        conversation_id: &str,
        new_shared_secret: &[u8],
        reason: RotationReason,
    ) -> Result<u64, KeyError> {
        loop {
            let current = self.store.load_record(conversation_id).await?;
            let (current_version, created_at_secs) = match &current {
                Some(record) => (record.version, record.created_at_secs),
                None => (0, unix_now_secs()),
            };

            let new_version = current_version + 1;
            let mut key = derive_conversation_key(new_shared_secret, conversation_id, new_version);
            let wrapped = self.wrap(&key)?;
            key.zeroize();

            let now = unix_now_secs();
            let record = ConversationKeyRecord {
                conversation_id: conversation_id.to_string(),
                version: new_version,
                wrapped_key: wrapped,
                created_at_secs,
                rotated_at_secs: Some(now),
            };

            match self.store.replace_record(&record, current_version).await {
                Ok(()) => {
                    self.store
                        .append_rotation(&RotationRecord {
                            conversation_id: conversation_id.to_string(),
                            old_version: current_version,
                            new_version,
                            reason,
                            timestamp_secs: now,
                        })
                        .await?;

                    tracing::info!(
                        conversation_id,
                        old_version = current_version,
                        new_version,
                        ?reason,
                        "conversation key rotated"
                    );

                    return Ok(new_version);
                },
                Err(StoreError::Conflict { expected, current }) => {
                    tracing::debug!(
                        conversation_id,
                        expected,
                        current,
                        "lost rotation race, retrying at new version"
                    );
                },
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// A conversation's rotation history, ordered by `new_version`
    /// ascending. Re-readable; never mutated.
    pub async fn rotation_history(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RotationRecord>, KeyError> {
        Ok(self.store.load_rotations(conversation_id).await?)
    }

    /// Remove a conversation's current key record (conversation
    /// deletion). The rotation history is retained as an audit log.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), KeyError> {
        self.store.delete_record(conversation_id).await?;

        tracing::debug!(conversation_id, "conversation key record deleted");

        Ok(())
    }

    fn wrap(&self, key: &[u8; 32]) -> Result<vaultwire_crypto::EncryptedPayload, KeyError> {
        self.session.with_key(|master| vaultwire_crypto::wrap_key(key, master.as_bytes()))
    }

    fn unwrap(&self, wrapped: &vaultwire_crypto::EncryptedPayload) -> Result<[u8; 32], KeyError> {
        self.session
            .with_key(|master| vaultwire_crypto::unwrap_key(wrapped, master.as_bytes()))?
            .map_err(KeyError::from)
    }
}
