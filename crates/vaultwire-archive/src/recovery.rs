//! Archive recovery service.
//!
//! The privileged decrypt-for-export path used by administrative
//! archival. It never touches client sessions: conversation keys reach
//! it through [`escrow_key`](ArchiveRecoveryService::escrow_key), wrapped
//! under an operator master key that is re-derived from the operator
//! password at every use and held only for the duration of one call.
//!
//! Failure scoping differs from normal messaging: failing to unwrap the
//! conversation key aborts the whole export, but a single message that
//! will not decrypt is emitted flagged, ciphertext intact, and the
//! export continues.

use serde::{Deserialize, Serialize};
use vaultwire_core::{ConversationKeyRecord, KeyStore};
use vaultwire_crypto::{EncryptedPayload, KdfAlgorithm, SALT_SIZE, derive_master_key};
use zeroize::Zeroize;

use crate::{
    error::ArchiveError,
    messages::{DateRange, MessageArchive},
};

/// One message in an export report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportedMessage {
    /// Decrypted successfully
    Decrypted {
        /// Platform message id
        message_id: String,
        /// Unix timestamp (seconds) the message was sent
        sent_at_secs: u64,
        /// Recovered plaintext (lossy UTF-8)
        plaintext: String,
    },
    /// Decryption failed; ciphertext preserved for later analysis
    Failed {
        /// Platform message id
        message_id: String,
        /// Unix timestamp (seconds) the message was sent
        sent_at_secs: u64,
        /// The undecryptable payload, intact
        payload: EncryptedPayload,
        /// Why decryption failed
        error: String,
    },
}

/// Result of one conversation export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Conversation that was exported
    pub conversation_id: String,
    /// Key version the mirror held at export time
    pub key_version: u64,
    /// Range the export covered
    pub range: DateRange,
    /// Messages decrypted successfully
    pub decrypted_count: usize,
    /// Messages emitted flagged with ciphertext intact
    pub failed_count: usize,
    /// All messages in range, in `sent_at_secs` order
    pub messages: Vec<ExportedMessage>,
}

/// Privileged decrypt-for-export service over a mirrored key store.
pub struct ArchiveRecoveryService<S: KeyStore, M: MessageArchive> {
    mirror: S,
    messages: M,
    operator_salt: [u8; SALT_SIZE],
    algorithm: KdfAlgorithm,
}

impl<S: KeyStore, M: MessageArchive> ArchiveRecoveryService<S, M> {
    /// Create a service over a mirror store and a message archive.
    ///
    /// The operator salt is fixed at provisioning time; the operator
    /// master key is re-derived from it and the supplied password on
    /// every escrow and export.
    pub fn new(mirror: S, messages: M, operator_salt: [u8; SALT_SIZE]) -> Self {
        Self { mirror, messages, operator_salt, algorithm: KdfAlgorithm::default() }
    }

    /// Create a service with an explicit operator KDF.
    pub fn with_algorithm(
        mirror: S,
        messages: M,
        operator_salt: [u8; SALT_SIZE],
        algorithm: KdfAlgorithm,
    ) -> Self {
        Self { mirror, messages, operator_salt, algorithm }
    }

    /// Ingest side of the mirror: wrap a conversation key under the
    /// operator master key and store it latest-wins.
    ///
    /// Invoked by the same membership pipeline that triggers rotation,
    /// so the mirror tracks the client hierarchy version-for-version.
    ///
    /// # Errors
    ///
    /// - `DerivationFailure` if the operator password is rejected
    pub async fn escrow_key(
        &self,
        conversation_id: &str,
        key: &[u8; 32],
        version: u64,
        password: &str,
    ) -> Result<(), ArchiveError> {
        let operator_key = self.operator_key(password)?;
        let wrapped_key = vaultwire_crypto::wrap_key(key, operator_key.as_bytes());

        let record = ConversationKeyRecord {
            conversation_id: conversation_id.to_string(),
            version,
            wrapped_key,
            created_at_secs: unix_now_secs(),
            rotated_at_secs: None,
        };

        self.mirror.store_record(&record).await?;

        tracing::debug!(conversation_id, version, "conversation key escrowed");

        Ok(())
    }

    /// Decrypt a conversation's messages in range for archival export.
    ///
    /// The conversation key is unwrapped once; failure there (missing
    /// mirror record, wrong operator password, corrupt record) aborts
    /// the export. Each message is then decrypted individually: a
    /// message that fails is emitted flagged with its ciphertext intact
    /// and the export continues.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the mirror has no record for the conversation
    /// - `AuthenticationFailure` if the mirrored key does not unwrap
    pub async fn export_decrypted(
        &self,
        conversation_id: &str,
        range: DateRange,
        password: &str,
    ) -> Result<ExportReport, ArchiveError> {
        let operator_key = self.operator_key(password)?;

        let record = self.mirror.load_record(conversation_id).await?.ok_or_else(|| {
            ArchiveError::MissingKey { conversation_id: conversation_id.to_string() }
        })?;

        let mut conversation_key =
            vaultwire_crypto::unwrap_key(&record.wrapped_key, operator_key.as_bytes())?;

        let stored = self.messages.load_range(conversation_id, range).await?;

        let mut messages = Vec::with_capacity(stored.len());
        let mut decrypted_count = 0;
        let mut failed_count = 0;

        for message in stored {
            match vaultwire_crypto::decrypt(&conversation_key, &message.payload) {
                Ok(plaintext) => {
                    decrypted_count += 1;
                    messages.push(ExportedMessage::Decrypted {
                        message_id: message.message_id,
                        sent_at_secs: message.sent_at_secs,
                        plaintext: String::from_utf8_lossy(&plaintext).into_owned(),
                    });
                },
                Err(err) => {
                    // Message-scoped failure: flag it, keep going
                    failed_count += 1;
                    tracing::warn!(
                        conversation_id,
                        message_id = %message.message_id,
                        %err,
                        "message failed to decrypt, emitting ciphertext"
                    );
                    messages.push(ExportedMessage::Failed {
                        message_id: message.message_id,
                        sent_at_secs: message.sent_at_secs,
                        payload: message.payload,
                        error: err.to_string(),
                    });
                },
            }
        }

        conversation_key.zeroize();

        tracing::info!(
            conversation_id,
            key_version = record.version,
            decrypted_count,
            failed_count,
            "archive export complete"
        );

        Ok(ExportReport {
            conversation_id: conversation_id.to_string(),
            key_version: record.version,
            range,
            decrypted_count,
            failed_count,
            messages,
        })
    }

    fn operator_key(&self, password: &str) -> Result<vaultwire_crypto::MasterKey, ArchiveError> {
        let (key, _) = derive_master_key(password, Some(self.operator_salt), self.algorithm)?;
        Ok(key)
    }
}

/// Current unix time in seconds, saturating to 0 on a pre-epoch clock.
fn unix_now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
