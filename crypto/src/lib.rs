//! Cryptographic primitives for cosign.
//!
//! - **Ed25519** for identities and event signatures
//! - **Blake2b** for event ids
//! - **X25519 + ChaCha20-Poly1305** for per-recipient and shared-key content encryption
//! - [`Authenticator`], the signing and encryption capability handed to the engine

pub mod authenticator;
pub mod encryption;
pub mod error;
pub mod event;
pub mod hash;
pub mod keys;
pub mod sign;

pub use authenticator::{Authenticator, AuthenticatorExt, KeyAuthenticator};
pub use error::CryptoError;
pub use event::{verify_event, EventBuilder};
pub use hash::{blake2b_256, blake2b_256_multi, compute_event_id};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
