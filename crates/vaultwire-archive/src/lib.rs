//! Vaultwire archive: the privileged server-side decrypt path.
//!
//! A parallel key hierarchy used only for administrative export, never
//! for normal messaging. Conversation keys are escrowed into a durable
//! mirror wrapped under an operator master key; export re-derives that
//! key from the operator password, unwraps the conversation key, and
//! decrypts message-by-message with partial-failure tolerance.
//!
//! ## Architecture
//!
//! ```text
//! Membership pipeline ──escrow_key──▶ RedbKeyStore (mirror)
//!                                          │
//! Operator password ──Argon2id──▶ operator MasterKey
//!                                          │ unwraps
//!                                          ▼
//! MessageArchive ──ciphertext──▶ ArchiveRecoveryService ──▶ ExportReport
//! ```
//!
//! The mirror and the client key store share one wrapping
//! implementation (`vaultwire-crypto`) and one persistence trait
//! (`vaultwire-core::KeyStore`); only the wrapping key differs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod messages;
pub mod mirror;
pub mod recovery;

pub use error::ArchiveError;
pub use messages::{DateRange, MemoryMessageArchive, MessageArchive, StoredMessage};
pub use mirror::RedbKeyStore;
pub use recovery::{ArchiveRecoveryService, ExportReport, ExportedMessage};
