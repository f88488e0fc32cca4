//! Redb-backed durable key store.
//!
//! Serves as the server-side mirror of wrapped conversation keys. Uses
//! Redb's ACID transactions with Copy-on-Write for crash safety; the
//! single-writer transaction model makes the version compare-and-swap
//! race-free. All state survives restarts.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use vaultwire_core::{
    ConversationKeyRecord, KeyBackupBundle, KeyStore, RotationRecord, StoreError,
};

/// Table: records
/// Key: conversation id
/// Value: CBOR-encoded `ConversationKeyRecord`
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Table: rotations
/// Key: (conversation id, `new_version`); tuple ordering keeps each
/// conversation's log contiguous and version-ascending
/// Value: CBOR-encoded `RotationRecord`
const ROTATIONS: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("rotations");

/// Table: bundles
/// Key: user id
/// Value: CBOR-encoded `KeyBackupBundle`
const BUNDLES: TableDefinition<&str, &[u8]> = TableDefinition::new("bundles");

/// Durable key store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (RECORDS, ROTATIONS, BUNDLES).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(RECORDS).map_err(|e| StoreError::Io(e.to_string()))?;
            let _ = txn.open_table(ROTATIONS).map_err(|e| StoreError::Io(e.to_string()))?;
            let _ = txn.open_table(BUNDLES).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl KeyStore for RedbKeyStore {
    async fn load_record(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationKeyRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StoreError::Io(e.to_string()))?;

        match table.get(conversation_id).map_err(|e| StoreError::Io(e.to_string()))? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    async fn store_record(&self, record: &ConversationKeyRecord) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(RECORDS).map_err(|e| StoreError::Io(e.to_string()))?;

            let bytes = encode(record)?;
            table
                .insert(record.conversation_id.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    async fn replace_record(
        &self,
        record: &ConversationKeyRecord,
        expected_current: u64,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(RECORDS).map_err(|e| StoreError::Io(e.to_string()))?;

            // Redb's single-writer transaction serializes this
            // read-compare-insert against every other writer.
            let current = match table
                .get(record.conversation_id.as_str())
                .map_err(|e| StoreError::Io(e.to_string()))?
            {
                Some(value) => decode::<ConversationKeyRecord>(value.value())?.version,
                None => 0,
            };

            if current != expected_current {
                return Err(StoreError::Conflict { expected: expected_current, current });
            }

            let bytes = encode(record)?;
            table
                .insert(record.conversation_id.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    async fn delete_record(&self, conversation_id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(RECORDS).map_err(|e| StoreError::Io(e.to_string()))?;
            table.remove(conversation_id).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<ConversationKeyRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StoreError::Io(e.to_string()))?;

        let mut records = Vec::new();
        for result in table.iter().map_err(|e| StoreError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StoreError::Io(e.to_string()))?;
            records.push(decode(value.value())?);
        }

        Ok(records)
    }

    async fn append_rotation(&self, record: &RotationRecord) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(ROTATIONS).map_err(|e| StoreError::Io(e.to_string()))?;

            let bytes = encode(record)?;
            table
                .insert((record.conversation_id.as_str(), record.new_version), bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    async fn load_rotations(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RotationRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(ROTATIONS).map_err(|e| StoreError::Io(e.to_string()))?;

        let range = (conversation_id, 0u64)..=(conversation_id, u64::MAX);
        let results = table.range(range).map_err(|e| StoreError::Io(e.to_string()))?;

        let mut rotations = Vec::new();
        for result in results {
            let (_, value) = result.map_err(|e| StoreError::Io(e.to_string()))?;
            rotations.push(decode(value.value())?);
        }

        Ok(rotations)
    }

    async fn store_bundle(
        &self,
        user_id: &str,
        bundle: &KeyBackupBundle,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(BUNDLES).map_err(|e| StoreError::Io(e.to_string()))?;

            let bytes = encode(bundle)?;
            table
                .insert(user_id, bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    async fn load_bundle(&self, user_id: &str) -> Result<Option<KeyBackupBundle>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(BUNDLES).map_err(|e| StoreError::Io(e.to_string()))?;

        match table.get(user_id).map_err(|e| StoreError::Io(e.to_string()))? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }
}
