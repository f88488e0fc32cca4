//! Persisted key-management records.
//!
//! These are the shapes the persistence boundary moves: the single
//! current wrapped key per conversation, the append-only rotation audit
//! log, and the per-user backup bundle.

use serde::{Deserialize, Serialize};
use vaultwire_crypto::{EncryptedPayload, KdfAlgorithm, SALT_SIZE};

/// Format version written into new backup bundles.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// The single current wrapped key for one conversation.
///
/// # Invariants
///
/// - Exactly one current record per `conversation_id`
/// - `version` starts at 1 and is strictly increasing across rotations
/// - `wrapped_key` is only meaningful together with the master key that
///   wrapped it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationKeyRecord {
    /// Conversation this key belongs to
    pub conversation_id: String,
    /// Key version, >= 1
    pub version: u64,
    /// Conversation key wrapped under the session master key
    pub wrapped_key: EncryptedPayload,
    /// Unix timestamp (seconds) when the first version was established
    pub created_at_secs: u64,
    /// Unix timestamp (seconds) of the last rotation, if any
    pub rotated_at_secs: Option<u64>,
}

/// Why a conversation key was rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationReason {
    /// A participant joined; rotation keeps prior history out of trivial
    /// reach of the new key
    MemberAdded,
    /// A participant left; rotation is mandatory so the removed member
    /// cannot decrypt subsequent traffic
    MemberRemoved,
    /// Operator- or user-initiated rotation
    Manual,
}

/// One entry in a conversation's rotation audit log.
///
/// Append-only: entries are never mutated or deleted, and survive
/// conversation deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationRecord {
    /// Conversation that was rotated
    pub conversation_id: String,
    /// Version that was replaced (0 when the rotation created version 1)
    pub old_version: u64,
    /// Version the rotation produced
    pub new_version: u64,
    /// What triggered the rotation
    pub reason: RotationReason,
    /// Unix timestamp (seconds) of the rotation
    pub timestamp_secs: u64,
}

/// A user's encrypted key backup.
///
/// The payload is the full wrapped record set, re-wrapped under a
/// password-derived key with its own salt. One bundle per user; the
/// latest write replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBackupBundle {
    /// Bundle format version ([`BUNDLE_FORMAT_VERSION`])
    pub version: u32,
    /// CBOR-encoded record set wrapped under the password-derived key
    pub wrapped_payload: EncryptedPayload,
    /// Salt for re-deriving the wrapping key from the password
    pub salt: [u8; SALT_SIZE],
    /// KDF the wrapping key was derived with
    pub algorithm: KdfAlgorithm,
    /// Unix timestamp (seconds) of the last export
    pub updated_at_secs: u64,
}

/// Current unix time in seconds.
///
/// Saturates to 0 on a pre-epoch clock rather than failing a key
/// operation over a timestamp.
pub(crate) fn unix_now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
