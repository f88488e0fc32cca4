//! Session-scoped master-key lifecycle.
//!
//! The master key exists only between login and logout. Rather than an
//! implicit singleton, it is an explicit key-context value: services hold
//! a [`MasterKeyHandle`] and every read goes through it, so the key's
//! lifetime is auditable and any operation against a locked or torn-down
//! session fails cleanly with `MissingKey` instead of touching zeroed
//! memory.

use std::sync::{Arc, RwLock};

use vaultwire_crypto::{KdfAlgorithm, MasterKey, SALT_SIZE, derive_master_key};

use crate::error::KeyError;

/// Cloneable handle to the session's master key.
///
/// Clones share the same underlying slot: unlocking through one handle
/// makes the key visible to all of them, and locking clears it for all of
/// them. Readers copy what they need under the lock; the lock is never
/// held across an await point.
#[derive(Clone, Default)]
pub struct MasterKeyHandle {
    inner: Arc<RwLock<Option<MasterKey>>>,
}

impl MasterKeyHandle {
    /// Create a locked handle (no master key set).
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the master key from a password and set it (login).
    ///
    /// Returns the salt so the caller can persist it for re-derivation on
    /// another device.
    ///
    /// # Errors
    ///
    /// - `DerivationFailure` if the password is empty or the KDF rejects
    ///   its parameters
    pub fn unlock(
        &self,
        password: &str,
        salt: Option<[u8; SALT_SIZE]>,
        algorithm: KdfAlgorithm,
    ) -> Result<[u8; SALT_SIZE], KeyError> {
        let (master_key, salt) = derive_master_key(password, salt, algorithm)?;
        self.install(master_key);

        Ok(salt)
    }

    /// Set an already-derived master key (provisioning, tests).
    pub fn install(&self, master_key: MasterKey) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(master_key);
        }
    }

    /// Clear the master key (logout). The key is zeroized on drop.
    ///
    /// Operations in flight observe the cleared slot and fail with
    /// `MissingKey`; they never see partially-cleared bytes.
    pub fn lock(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }

    /// Whether a master key is currently set.
    pub fn is_unlocked(&self) -> bool {
        self.inner.read().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Run a closure against the master key.
    ///
    /// # Errors
    ///
    /// - `MissingKey` when the session is locked or torn down (a poisoned
    ///   slot counts as torn down)
    pub fn with_key<T>(&self, f: impl FnOnce(&MasterKey) -> T) -> Result<T, KeyError> {
        let slot = self.inner.read().map_err(|_| KeyError::missing("session torn down"))?;

        match slot.as_ref() {
            Some(master_key) => Ok(f(master_key)),
            None => Err(KeyError::missing("no master key: session is locked")),
        }
    }
}
