//! Signing and encryption capabilities bound to one key pair.
//!
//! The caller's identity and every policy's shared key are both represented as
//! an [`Authenticator`]; handlers never touch raw private keys.

use cosign_types::{Event, KeyPair, PrivateKey, PublicKey, Signature};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encryption;
use crate::error::CryptoError;
use crate::event::EventBuilder;
use crate::keys::{generate_keypair, keypair_from_private};
use crate::sign::sign_message;

pub trait Authenticator: Send + Sync {
    fn public_key(&self) -> PublicKey;

    fn sign(&self, message: &[u8]) -> Signature;

    /// Encrypt `plaintext` so that `counterparty` (or this key) can read it.
    fn encrypt(&self, plaintext: &str, counterparty: &PublicKey) -> Result<String, CryptoError>;

    /// Decrypt content exchanged with `counterparty`.
    fn decrypt(&self, payload: &str, counterparty: &PublicKey) -> Result<String, CryptoError>;
}

/// Typed helpers over any [`Authenticator`], including trait objects.
pub trait AuthenticatorExt: Authenticator {
    /// Serialize `obj` as JSON and encrypt it to this key itself.
    fn encrypt_obj<T: Serialize>(&self, obj: &T) -> Result<String, CryptoError> {
        self.encrypt_obj_to(obj, &self.public_key())
    }

    fn encrypt_obj_to<T: Serialize>(
        &self,
        obj: &T,
        counterparty: &PublicKey,
    ) -> Result<String, CryptoError> {
        self.encrypt(&serde_json::to_string(obj)?, counterparty)
    }

    /// Decrypt content this key encrypted to itself and parse it as JSON.
    fn decrypt_obj<T: DeserializeOwned>(&self, payload: &str) -> Result<T, CryptoError> {
        self.decrypt_obj_from(payload, &self.public_key())
    }

    fn decrypt_obj_from<T: DeserializeOwned>(
        &self,
        payload: &str,
        counterparty: &PublicKey,
    ) -> Result<T, CryptoError> {
        Ok(serde_json::from_str(&self.decrypt(payload, counterparty)?)?)
    }

    fn sign_event(&self, builder: EventBuilder) -> Event {
        builder.sign(self)
    }
}

impl<A: Authenticator + ?Sized> AuthenticatorExt for A {}

/// [`Authenticator`] backed by an in-memory key pair.
pub struct KeyAuthenticator {
    keys: KeyPair,
}

impl KeyAuthenticator {
    pub fn new(keys: KeyPair) -> Self {
        Self { keys }
    }

    /// A fresh random key, as used for a new policy's shared key.
    pub fn generate() -> Self {
        Self::new(generate_keypair())
    }

    pub fn from_private(private: PrivateKey) -> Self {
        Self::new(keypair_from_private(private))
    }

    pub fn from_secret_hex(secret: &str) -> Result<Self, CryptoError> {
        Ok(Self::from_private(PrivateKey::from_hex(secret)?))
    }

    /// Hex of the secret key, for distributing a shared key to participants.
    pub fn secret_hex(&self) -> String {
        self.keys.private.to_hex()
    }
}

impl Authenticator for KeyAuthenticator {
    fn public_key(&self) -> PublicKey {
        self.keys.public
    }

    fn sign(&self, message: &[u8]) -> Signature {
        sign_message(message, &self.keys.private)
    }

    fn encrypt(&self, plaintext: &str, counterparty: &PublicKey) -> Result<String, CryptoError> {
        encryption::encrypt(plaintext.as_bytes(), &self.keys.private, counterparty)
    }

    fn decrypt(&self, payload: &str, counterparty: &PublicKey) -> Result<String, CryptoError> {
        let bytes = encryption::decrypt(payload, &self.keys.private, counterparty)?;
        String::from_utf8(bytes).map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))
    }
}

impl std::fmt::Debug for KeyAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyAuthenticator")
            .field("public_key", &self.keys.public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Body {
        name: String,
    }

    #[test]
    fn objects_round_trip_through_self_encryption() {
        let auth = KeyAuthenticator::generate();
        let body = Body { name: "vault".into() };
        let payload = auth.encrypt_obj(&body).unwrap();
        assert_eq!(auth.decrypt_obj::<Body>(&payload).unwrap(), body);
    }

    #[test]
    fn shared_key_survives_hex_export() {
        let shared = KeyAuthenticator::generate();
        let payload = shared.encrypt_obj(&Body { name: "p".into() }).unwrap();
        let imported = KeyAuthenticator::from_secret_hex(&shared.secret_hex()).unwrap();
        assert_eq!(imported.public_key(), shared.public_key());
        assert_eq!(imported.decrypt_obj::<Body>(&payload).unwrap().name, "p");
    }

    #[test]
    fn works_through_trait_objects() {
        let alice: Arc<dyn Authenticator> = Arc::new(KeyAuthenticator::generate());
        let bob = KeyAuthenticator::generate();
        let payload = alice
            .encrypt_obj_to(&Body { name: "x".into() }, &bob.public_key())
            .unwrap();
        let body: Body = bob.decrypt_obj_from(&payload, &alice.public_key()).unwrap();
        assert_eq!(body.name, "x");
    }

    #[test]
    fn wrong_shape_is_a_serialization_error() {
        let auth = KeyAuthenticator::generate();
        let payload = auth.encrypt("[1,2]", &auth.public_key()).unwrap();
        assert!(matches!(
            auth.decrypt_obj::<Body>(&payload),
            Err(CryptoError::Serialization(_))
        ));
    }
}
