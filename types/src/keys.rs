//! Cryptographic key types for participant identity and event signing.
//!
//! Public keys, signatures and event ids travel as lowercase hex strings on the
//! wire (inside tags and event JSON), so every 32/64-byte newtype here
//! serializes through its hex representation.

use crate::error::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

macro_rules! hex_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
                let arr: [u8; $len] = bytes
                    .try_into()
                    .map_err(|v: Vec<u8>| TypeError::InvalidLength {
                        expected: $len,
                        actual: v.len(),
                    })?;
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(
    /// A 32-byte Ed25519 public key identifying a participant.
    PublicKey,
    32
);

hex_newtype!(
    /// A 64-byte Ed25519 signature over an event id.
    Signature,
    64
);

hex_newtype!(
    /// A 32-byte Blake2b event id.
    EventId,
    32
);

/// A 32-byte Ed25519 private key (secret seed).
///
/// This type intentionally does not implement `Debug`, `Serialize`, or `Clone`
/// to prevent accidental exposure. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

impl PrivateKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let mut bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual,
            });
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// An Ed25519 key pair (public + private).
///
/// Use `cosign_crypto::generate_keypair()` or `cosign_crypto::keypair_from_private()`
/// to construct key pairs. This struct is intentionally just data.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_hex_roundtrip() {
        let pk = PublicKey([7u8; 32]);
        let parsed: PublicKey = pk.to_hex().parse().unwrap();
        assert_eq!(pk, parsed);
    }

    #[test]
    fn wrong_length_rejected() {
        let err = EventId::from_hex("abcd").unwrap_err();
        assert!(matches!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        ));
    }

    #[test]
    fn non_hex_rejected() {
        assert!(matches!(
            PublicKey::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = EventId([0xab; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn debug_is_abbreviated() {
        let pk = PublicKey([0x01; 32]);
        assert_eq!(format!("{pk:?}"), "PublicKey(01010101)");
    }
}
