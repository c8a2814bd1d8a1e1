//! Protocol events: signed, timestamped, kinded records with tags and content.

use crate::error::TypeError;
use crate::keys::{EventId, PublicKey, Signature};
use crate::kind::Kind;
use crate::tag::{Tag, TagKind};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// An event before it has been hashed and signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedEvent {
    pub pubkey: PublicKey,
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    /// The byte string the event id is the hash of:
    /// `[0, pubkey, created_at, kind, tags, content]` as compact JSON.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }
}

fn canonical_bytes(
    pubkey: &PublicKey,
    created_at: Timestamp,
    kind: Kind,
    tags: &[Tag],
    content: &str,
) -> Vec<u8> {
    serde_json::to_vec(&(0u8, pubkey, created_at, kind, tags, content))
        .expect("canonical event tuple is always serializable")
}

/// A published, immutable protocol event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: Signature,
}

impl Event {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// First values of every tag of the given type, in tag order.
    pub fn tag_values(&self, kind: TagKind) -> impl Iterator<Item = &str> + '_ {
        self.tags
            .iter()
            .filter(move |t| t.is(kind))
            .filter_map(Tag::value)
    }

    pub fn first_tag_value(&self, kind: TagKind) -> Option<&str> {
        self.tag_values(kind).next()
    }

    /// Tags of the given type, whole.
    pub fn tags_of(&self, kind: TagKind) -> impl Iterator<Item = &Tag> + '_ {
        self.tags.iter().filter(move |t| t.is(kind))
    }

    /// Event ids referenced through `e` tags.
    pub fn event_refs(&self) -> Result<Vec<EventId>, TypeError> {
        self.tag_values(TagKind::Event)
            .map(|v| parse_tag(TagKind::Event, v, EventId::from_hex))
            .collect()
    }

    /// The first `e` reference, which for policy-scoped kinds is the owning policy
    /// (or, for approvals and completions, the proposal).
    pub fn first_event_ref(&self) -> Result<EventId, TypeError> {
        let value = self
            .first_tag_value(TagKind::Event)
            .ok_or_else(|| self.missing(TagKind::Event))?;
        parse_tag(TagKind::Event, value, EventId::from_hex)
    }

    /// Participant public keys referenced through `p` tags.
    pub fn pubkey_refs(&self) -> Result<Vec<PublicKey>, TypeError> {
        self.tag_values(TagKind::PubKey)
            .map(|v| parse_tag(TagKind::PubKey, v, PublicKey::from_hex))
            .collect()
    }

    /// Kinds referenced through `k` tags.
    pub fn kind_refs(&self) -> Result<Vec<Kind>, TypeError> {
        self.tag_values(TagKind::Kind)
            .map(|v| {
                v.parse::<u32>()
                    .map(Kind)
                    .map_err(|_| TypeError::MalformedTag {
                        tag: TagKind::Kind.as_str(),
                        value: v.to_string(),
                    })
            })
            .collect()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.first_tag_value(TagKind::Identifier)
    }

    pub fn expiration(&self) -> Result<Option<Timestamp>, TypeError> {
        self.first_tag_value(TagKind::Expiration)
            .map(|v| {
                v.parse::<u64>()
                    .map(Timestamp::new)
                    .map_err(|_| TypeError::MalformedTag {
                        tag: TagKind::Expiration.as_str(),
                        value: v.to_string(),
                    })
            })
            .transpose()
    }

    pub fn missing(&self, tag: TagKind) -> TypeError {
        TypeError::MissingTag {
            event: self.id.to_hex(),
            tag: tag.as_str(),
        }
    }
}

fn parse_tag<T>(
    kind: TagKind,
    value: &str,
    parse: impl Fn(&str) -> Result<T, TypeError>,
) -> Result<T, TypeError> {
    parse(value).map_err(|_| TypeError::MalformedTag {
        tag: kind.as_str(),
        value: value.to_string(),
    })
}
