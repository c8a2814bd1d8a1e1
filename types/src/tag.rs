//! Event tags: ordered string arrays whose first element names the tag type.

use crate::keys::{EventId, PublicKey};
use crate::kind::Kind;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// The tag types this protocol reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Reference to another event (`"e"`).
    Event,
    /// Reference to a participant public key (`"p"`).
    PubKey,
    /// Reference to an event kind, used by deletions (`"k"`).
    Kind,
    /// Identifier of a replaceable event (`"d"`).
    Identifier,
    /// Unix time after which the event is stale (`"expiration"`).
    Expiration,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "e",
            Self::PubKey => "p",
            Self::Kind => "k",
            Self::Identifier => "d",
            Self::Expiration => "expiration",
        }
    }
}

/// A single event tag, e.g. `["e", "<event id>"]` or `["p", "<pubkey>", "<relay>", "<petname>"]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Vec<String>);

impl Tag {
    pub fn new(kind: TagKind, values: impl IntoIterator<Item = String>) -> Self {
        let mut parts = vec![kind.as_str().to_string()];
        parts.extend(values);
        Self(parts)
    }

    pub fn event(id: &EventId) -> Self {
        Self::new(TagKind::Event, [id.to_hex()])
    }

    pub fn pubkey(pk: &PublicKey) -> Self {
        Self::new(TagKind::PubKey, [pk.to_hex()])
    }

    pub fn kind(kind: Kind) -> Self {
        Self::new(TagKind::Kind, [kind.as_u32().to_string()])
    }

    pub fn identifier(id: impl Into<String>) -> Self {
        Self::new(TagKind::Identifier, [id.into()])
    }

    pub fn expiration(at: Timestamp) -> Self {
        Self::new(TagKind::Expiration, [at.as_secs().to_string()])
    }

    pub fn from_parts(parts: Vec<String>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn is(&self, kind: TagKind) -> bool {
        self.0.first().map(String::as_str) == Some(kind.as_str())
    }

    /// First value after the tag type.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    /// All values after the tag type.
    pub fn values(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }
}
