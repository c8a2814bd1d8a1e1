//! Signer descriptors: owned by the caller, or shared with the caller by another participant.

use crate::keys::{EventId, PublicKey};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Encrypted body of an owned-signer event, readable only by its author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedSignerContent {
    pub description: String,
    pub descriptor: String,
    pub fingerprint: String,
    pub name: String,
    /// Signer type (e.g. `"Seed"`, `"Hardware"`).
    pub t: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedSigner {
    pub id: EventId,
    pub owner: PublicKey,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub signer: OwnedSignerContent,
}

impl OwnedSigner {
    pub fn fingerprint(&self) -> &str {
        &self.signer.fingerprint
    }
}

/// Encrypted body of a shared-signer event, readable by the owner and the recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSignerContent {
    pub descriptor: String,
    pub fingerprint: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSigner {
    pub id: EventId,
    pub owner: PublicKey,
    pub shared_with: PublicKey,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub signer: SharedSignerContent,
}
