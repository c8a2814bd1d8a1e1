//! Ed25519 identity keys and their X25519 counterparts for content encryption.

use cosign_types::{KeyPair, PrivateKey, PublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

use crate::error::CryptoError;

/// Generate a new Ed25519 key pair from a secure random source.
///
/// Used both for participant identities and for the per-policy shared key.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    keypair_from_signing_key(&signing_key)
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_signing_key(&SigningKey::from_bytes(seed))
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey(SigningKey::from_bytes(&private.0).verifying_key().to_bytes())
}

fn keypair_from_signing_key(signing_key: &SigningKey) -> KeyPair {
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// X25519 secret matching an Ed25519 private key.
pub(crate) fn x25519_secret(private: &PrivateKey) -> StaticSecret {
    StaticSecret::from(SigningKey::from_bytes(&private.0).to_scalar_bytes())
}

/// X25519 public key matching an Ed25519 public key (Edwards to Montgomery).
pub(crate) fn x25519_public(public: &PublicKey) -> Result<X25519Public, CryptoError> {
    let verifying_key = VerifyingKey::from_bytes(&public.0)
        .map_err(|_| CryptoError::InvalidPublicKey(public.to_hex()))?;
    Ok(X25519Public::from(verifying_key.to_montgomery().to_bytes()))
}
