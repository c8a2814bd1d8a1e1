//! Plaintext profile metadata and contact lists.

use crate::keys::PublicKey;
use crate::tag::{Tag, TagKind};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Self-published profile fields. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lud06: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lud16: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

impl Metadata {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }
}

/// Metadata of one public key. Keys that never published metadata get a
/// profile with empty metadata and no timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub public_key: PublicKey,
    pub metadata: Metadata,
    pub created_at: Option<Timestamp>,
}

impl Profile {
    pub fn empty(public_key: PublicKey) -> Self {
        Self {
            public_key,
            metadata: Metadata::default(),
            created_at: None,
        }
    }
}

/// One entry of a contact list, carried as `["p", pubkey, relay, petname]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub public_key: PublicKey,
    pub relay: Option<String>,
    pub petname: Option<String>,
}

impl Contact {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            relay: None,
            petname: None,
        }
    }

    pub fn with_relay(mut self, relay: impl Into<String>) -> Self {
        self.relay = Some(relay.into());
        self
    }

    pub fn with_petname(mut self, petname: impl Into<String>) -> Self {
        self.petname = Some(petname.into());
        self
    }

    pub fn to_tag(&self) -> Tag {
        let mut values = vec![self.public_key.to_hex()];
        if self.relay.is_some() || self.petname.is_some() {
            values.push(self.relay.clone().unwrap_or_default());
        }
        if let Some(petname) = &self.petname {
            values.push(petname.clone());
        }
        Tag::new(TagKind::PubKey, values)
    }

    /// Parse a `p` tag. Returns `None` for other tags or malformed keys.
    pub fn from_tag(tag: &Tag) -> Option<Self> {
        if !tag.is(TagKind::PubKey) {
            return None;
        }
        let values = tag.values();
        let public_key = PublicKey::from_hex(values.first()?).ok()?;
        let non_empty = |i: usize| values.get(i).filter(|v| !v.is_empty()).cloned();
        Some(Self {
            public_key,
            relay: non_empty(1),
            petname: non_empty(2),
        })
    }

    /// Merge `updates` into `current`: an update replaces the entry with the
    /// same public key in place, new keys are appended.
    pub fn merge(current: Vec<Contact>, updates: Vec<Contact>) -> Vec<Contact> {
        let mut merged = current;
        for update in updates {
            match merged.iter_mut().find(|c| c.public_key == update.public_key) {
                Some(existing) => *existing = update,
                None => merged.push(update),
            }
        }
        merged
    }
}

/// A contact joined with the contact's published profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProfile {
    pub contact: Contact,
    pub profile: Profile,
}
