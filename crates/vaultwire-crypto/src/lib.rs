//! Vaultwire Cryptographic Primitives
//!
//! Cryptographic building blocks for the Vaultwire key-management core.
//! Pure CPU-bound functions with no I/O; persistence and session state
//! live in `vaultwire-core`.
//!
//! # Key Hierarchy
//!
//! ```text
//! Password ──Argon2id/PBKDF2──▶ MasterKey (session-scoped wrapping key)
//!                                    │
//! X25519 ECDH ──▶ Shared Secret      │ wraps
//!                      │             ▼
//!                      ▼        ConversationKeyRecord (at rest)
//!        HKDF ──▶ Conversation Key (per conversation, per version)
//!                      │
//!                      ▼
//!        AES-256-GCM ──▶ EncryptedPayload (messages)
//! ```
//!
//! Rotating a conversation to a new version derives a fresh, unrelated
//! key from a new shared secret; old versions cannot decrypt traffic
//! encrypted under the new one.
//!
//! # Security
//!
//! Confidentiality and authenticity:
//! - AES-256-GCM authenticated encryption; tag verification precedes any
//!   plaintext release
//! - Fresh CSPRNG IV per encryption; an IV is never reused under a key
//!
//! Forward secrecy at membership boundaries:
//! - Member removal derives a new key version from a new shared secret
//! - Old-version keys cannot decrypt new-version ciphertext
//!
//! Key hygiene:
//! - Master keys and X25519 secrets are zeroized on drop
//! - Wrapped keys are only meaningful together with the wrapping key

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod derive;
pub mod error;
pub mod exchange;
pub mod password;
pub mod wrap;

pub use cipher::{EncryptedPayload, IV_SIZE, KEY_SIZE, TAG_SIZE, decrypt, encrypt};
pub use derive::derive_conversation_key;
pub use error::CryptoError;
pub use exchange::{EXCHANGE_KEY_SIZE, IdentityKeyPair, derive_shared_secret};
pub use password::{KdfAlgorithm, MasterKey, SALT_SIZE, derive_master_key, generate_salt};
pub use wrap::{unwrap_key, wrap_key};
