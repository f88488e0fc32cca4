//! X25519 identity key pairs and shared-secret agreement.
//!
//! Each device generates one identity pair at registration and keeps the
//! private half for its lifetime. Two devices that exchange public keys
//! independently compute the same shared secret, which seeds the
//! conversation-key derivation in [`crate::derive`].

use core::fmt;

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// X25519 key size (32 bytes for both halves)
pub const EXCHANGE_KEY_SIZE: usize = 32;

/// A device's long-lived X25519 identity key pair.
///
/// The private half never leaves the device: it is not serializable and is
/// zeroized when the pair is dropped. Callers that copy the raw scalar out
/// via [`private_key`](Self::private_key) must erase their copy promptly
/// after use.
pub struct IdentityKeyPair {
    secret: StaticSecret,
    public: PublicKey,
    /// User this pair belongs to
    pub owner_id: String,
    /// Device that generated and exclusively holds the private half
    pub device_id: String,
}

impl IdentityKeyPair {
    /// Generate a fresh pair from the OS CSPRNG.
    pub fn generate(owner_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);

        Self { secret, public, owner_id: owner_id.into(), device_id: device_id.into() }
    }

    /// Public half, safe to publish.
    pub fn public_key(&self) -> [u8; EXCHANGE_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Raw private scalar.
    ///
    /// Exists for callers that feed [`derive_shared_secret`] directly.
    /// The copy must be erased promptly after use.
    pub fn private_key(&self) -> [u8; EXCHANGE_KEY_SIZE] {
        self.secret.to_bytes()
    }

    /// Compute the shared secret with a peer's public key.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if the peer key is not 32 bytes
    pub fn shared_secret(&self, peer_public: &[u8]) -> Result<[u8; 32], CryptoError> {
        let point = exchange_key(peer_public)?;
        Ok(*self.secret.diffie_hellman(&PublicKey::from(point)).as_bytes())
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Private half never printed
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public)
            .field("owner_id", &self.owner_id)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

/// X25519 scalar multiplication over raw key bytes.
///
/// Symmetric: `derive_shared_secret(a_priv, b_pub)` equals
/// `derive_shared_secret(b_priv, a_pub)` for any two pairs.
///
/// # Errors
///
/// - `InvalidKeyLength` if either input is not 32 bytes
pub fn derive_shared_secret(
    private_key: &[u8],
    peer_public: &[u8],
) -> Result<[u8; 32], CryptoError> {
    let mut scalar = exchange_key(private_key)?;
    let point = exchange_key(peer_public)?;

    let shared = x25519_dalek::x25519(scalar, point);
    scalar.zeroize();

    Ok(shared)
}

fn exchange_key(bytes: &[u8]) -> Result<[u8; EXCHANGE_KEY_SIZE], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: EXCHANGE_KEY_SIZE,
        actual: bytes.len(),
    })
}
