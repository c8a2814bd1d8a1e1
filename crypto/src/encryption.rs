//! Content encryption between two identities.
//!
//! Uses X25519 Diffie-Hellman between the sender's secret and the counterparty's
//! public key (both derived from their Ed25519 identities), Blake2b to derive
//! the symmetric key, and ChaCha20-Poly1305 AEAD with a random nonce.
//!
//! The wire form is `hex(nonce || ciphertext)`, so encrypted content can be
//! placed directly into an event's `content` field. Because DH is symmetric,
//! either party can decrypt, and a key pair can encrypt to itself.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use cosign_types::{PrivateKey, PublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::hash::blake2b_256_multi;
use crate::keys::{x25519_public, x25519_secret};

const KEY_DOMAIN: &[u8] = b"cosign-content-v1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn cipher(secret: &PrivateKey, counterparty: &PublicKey) -> Result<ChaCha20Poly1305, CryptoError> {
    let shared = x25519_secret(secret).diffie_hellman(&x25519_public(counterparty)?);
    let mut sym_key = blake2b_256_multi(&[shared.as_bytes(), KEY_DOMAIN]);
    let cipher = ChaCha20Poly1305::new_from_slice(&sym_key).map_err(|_| CryptoError::Encryption);
    sym_key.zeroize();
    cipher
}

/// Encrypt `plaintext` from `sender` to `counterparty`.
pub fn encrypt(
    plaintext: &[u8],
    sender: &PrivateKey,
    counterparty: &PublicKey,
) -> Result<String, CryptoError> {
    let cipher = cipher(sender, counterparty)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);
    Ok(hex::encode(payload))
}

/// Decrypt a payload produced by [`encrypt`] between the same two identities.
pub fn decrypt(
    payload: &str,
    recipient: &PrivateKey,
    counterparty: &PublicKey,
) -> Result<Vec<u8>, CryptoError> {
    let bytes = hex::decode(payload).map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
    if bytes.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "{} bytes is shorter than nonce and tag",
            bytes.len()
        )));
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    cipher(recipient, counterparty)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    #[test]
    fn either_party_can_decrypt() {
        let alice = generate_keypair();
        let bob = generate_keypair();

        let payload = encrypt(b"shared secret", &alice.private, &bob.public).unwrap();
        assert_eq!(
            decrypt(&payload, &bob.private, &alice.public).unwrap(),
            b"shared secret"
        );
        assert_eq!(
            decrypt(&payload, &alice.private, &bob.public).unwrap(),
            b"shared secret"
        );
    }

    #[test]
    fn self_encryption_round_trips() {
        let kp = generate_keypair();
        let payload = encrypt(b"owned signer", &kp.private, &kp.public).unwrap();
        assert_eq!(
            decrypt(&payload, &kp.private, &kp.public).unwrap(),
            b"owned signer"
        );
    }

    #[test]
    fn third_party_cannot_decrypt() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let eve = generate_keypair();

        let payload = encrypt(b"policy", &alice.private, &bob.public).unwrap();
        assert!(matches!(
            decrypt(&payload, &eve.private, &alice.public),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn nonces_are_fresh() {
        let kp = generate_keypair();
        let a = encrypt(b"same", &kp.private, &kp.public).unwrap();
        let b = encrypt(b"same", &kp.private, &kp.public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_or_truncated_payloads_are_rejected() {
        let kp = generate_keypair();
        let payload = encrypt(b"data", &kp.private, &kp.public).unwrap();

        let mut bytes = hex::decode(&payload).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            decrypt(&hex::encode(bytes), &kp.private, &kp.public),
            Err(CryptoError::Decryption)
        ));

        assert!(matches!(
            decrypt("abcd", &kp.private, &kp.public),
            Err(CryptoError::MalformedCiphertext(_))
        ));
        assert!(matches!(
            decrypt("not hex", &kp.private, &kp.public),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }
}
