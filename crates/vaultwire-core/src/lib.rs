//! Vaultwire key-management core.
//!
//! State machines and persistence boundary for the E2EE key hierarchy:
//! session master-key lifecycle, per-conversation key management with
//! versioned rotation, and encrypted key backup.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   ├─ MasterKeyHandle (session layer: login/logout lifecycle)
//!   ├─ ConversationKeyManager (key layer) ─ rotation, CAS on version
//!   ├─ KeyBackupService (recovery layer)
//!   └─ KeyStore (persistence boundary, engine-agnostic)
//! ```
//!
//! Cryptographic primitives live in `vaultwire-crypto`; this crate owns
//! the records, the versioning/rotation state machine, and the async
//! persistence edge. Only store operations suspend; everything
//! cryptographic is CPU-bound and synchronous.
//!
//! ## Concurrency
//!
//! Reads are unrestricted. Read-then-write sequences on one
//! conversation's record (rotation) are serialized by optimistic
//! compare-and-swap on the version; different conversations never
//! contend. The master key is session-scoped: operations in flight when
//! the session is torn down fail cleanly with `MissingKey`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backup;
pub mod error;
pub mod manager;
pub mod records;
pub mod session;
pub mod store;

pub use backup::KeyBackupService;
pub use error::KeyError;
pub use manager::ConversationKeyManager;
pub use records::{
    BUNDLE_FORMAT_VERSION, ConversationKeyRecord, KeyBackupBundle, RotationReason, RotationRecord,
};
pub use session::MasterKeyHandle;
pub use store::{KeyStore, MemoryKeyStore, StoreError};
