//! Encrypted key backup and recovery.
//!
//! Exports the full wrapped record set as one bundle, re-wrapped under a
//! password-derived key with its own salt, so it can live in an untrusted
//! location without that location ever seeing plaintext keys. Import
//! re-derives the wrapping key from the password and the bundle's salt;
//! a wrong password surfaces as a typed error, never as a
//! plausible-but-wrong record set.
//!
//! Cancellation safety: the bundle is written with a single put, and
//! restore writes one whole record per put. Dropping the future between
//! awaits never leaves a partially-written bundle or record.

use vaultwire_crypto::{CryptoError, KdfAlgorithm, derive_master_key};
use zeroize::Zeroize;

use crate::{
    error::KeyError,
    records::{BUNDLE_FORMAT_VERSION, ConversationKeyRecord, KeyBackupBundle, unix_now_secs},
    store::{KeyStore, StoreError},
};

/// Exports and imports a user's full wrapped key set.
pub struct KeyBackupService<S: KeyStore> {
    store: S,
    algorithm: KdfAlgorithm,
}

impl<S: KeyStore> KeyBackupService<S> {
    /// Create a backup service with the default KDF (Argon2id).
    pub fn new(store: S) -> Self {
        Self { store, algorithm: KdfAlgorithm::default() }
    }

    /// Create a backup service with an explicit KDF for bundle wrapping.
    pub fn with_algorithm(store: S, algorithm: KdfAlgorithm) -> Self {
        Self { store, algorithm }
    }

    /// Export all wrapped key records as one encrypted bundle and persist
    /// it (latest write replaces the previous bundle; no history).
    ///
    /// The bundle wrapping key is derived from the password with a fresh
    /// salt, independent of the session master key: the records inside
    /// stay wrapped under the master key, and the bundle adds a second
    /// layer for the untrusted storage location.
    ///
    /// # Errors
    ///
    /// - `DerivationFailure` if the password is rejected
    pub async fn export_bundle(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<KeyBackupBundle, KeyError> {
        let records = self.store.list_records().await?;

        let mut serialized = Vec::new();
        ciborium::into_writer(&records, &mut serialized)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let (wrapping_key, salt) = derive_master_key(password, None, self.algorithm)?;
        let wrapped_payload = vaultwire_crypto::encrypt(wrapping_key.as_bytes(), &serialized);
        serialized.zeroize();

        let bundle = KeyBackupBundle {
            version: BUNDLE_FORMAT_VERSION,
            wrapped_payload,
            salt,
            algorithm: self.algorithm,
            updated_at_secs: unix_now_secs(),
        };

        self.store.store_bundle(user_id, &bundle).await?;

        tracing::info!(user_id, record_count = records.len(), "key backup exported");

        Ok(bundle)
    }

    /// Decrypt a bundle back into its wrapped record set.
    ///
    /// # Errors
    ///
    /// - `WrongPassword` when the wrapping key derived from the password
    ///   does not verify the bundle's tag
    /// - `BackupCorrupt` for an unsupported format version or a payload
    ///   that authenticated but does not parse
    pub fn import_bundle(
        &self,
        bundle: &KeyBackupBundle,
        password: &str,
    ) -> Result<Vec<ConversationKeyRecord>, KeyError> {
        if bundle.version != BUNDLE_FORMAT_VERSION {
            return Err(KeyError::BackupCorrupt {
                reason: format!("unsupported bundle version {}", bundle.version),
            });
        }

        let (wrapping_key, _) = derive_master_key(password, Some(bundle.salt), bundle.algorithm)?;

        let mut serialized =
            vaultwire_crypto::decrypt(wrapping_key.as_bytes(), &bundle.wrapped_payload).map_err(
                |err| match err {
                    CryptoError::DecryptionFailure => KeyError::WrongPassword,
                    other => other.into(),
                },
            )?;

        let records: Vec<ConversationKeyRecord> = ciborium::from_reader(serialized.as_slice())
            .map_err(|e| KeyError::BackupCorrupt { reason: e.to_string() })?;
        serialized.zeroize();

        Ok(records)
    }

    /// Device-recovery path: load the user's stored bundle, decrypt it,
    /// and write every record back into the store.
    ///
    /// Returns the number of restored records.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the user never exported a bundle
    /// - `WrongPassword` / `BackupCorrupt` as for
    ///   [`import_bundle`](Self::import_bundle)
    pub async fn restore(&self, user_id: &str, password: &str) -> Result<usize, KeyError> {
        let bundle = self
            .store
            .load_bundle(user_id)
            .await?
            .ok_or_else(|| KeyError::missing(format!("no backup bundle for {user_id}")))?;

        let records = self.import_bundle(&bundle, password)?;

        for record in &records {
            self.store.store_record(record).await?;
        }

        tracing::info!(user_id, record_count = records.len(), "key backup restored");

        Ok(records.len())
    }
}
