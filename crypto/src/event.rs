//! Building, signing and verifying protocol events.

use cosign_types::{Event, EventId, Kind, PublicKey, Tag, Timestamp, UnsignedEvent};

use crate::authenticator::Authenticator;
use crate::error::CryptoError;
use crate::hash::{blake2b_256, compute_event_id};
use crate::sign::verify_signature;

/// Accumulates the parts of an event before it is signed by an [`Authenticator`].
#[derive(Clone, Debug)]
pub struct EventBuilder {
    kind: Kind,
    content: String,
    tags: Vec<Tag>,
    created_at: Option<Timestamp>,
}

impl EventBuilder {
    pub fn new(kind: Kind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            tags: Vec::new(),
            created_at: None,
        }
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Override the creation time. Defaults to the current time when signing.
    pub fn created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn to_unsigned(self, pubkey: PublicKey) -> UnsignedEvent {
        UnsignedEvent {
            pubkey,
            created_at: self.created_at.unwrap_or_else(Timestamp::now),
            kind: self.kind,
            tags: self.tags,
            content: self.content,
        }
    }

    pub fn sign<A: Authenticator + ?Sized>(self, authenticator: &A) -> Event {
        let unsigned = self.to_unsigned(authenticator.public_key());
        let id = compute_event_id(&unsigned);
        let sig = authenticator.sign(id.as_bytes());
        Event {
            id,
            pubkey: unsigned.pubkey,
            created_at: unsigned.created_at,
            kind: unsigned.kind,
            tags: unsigned.tags,
            content: unsigned.content,
            sig,
        }
    }
}

/// Check that an event's id matches its contents and that its author signed it.
pub fn verify_event(event: &Event) -> Result<(), CryptoError> {
    let expected = EventId(blake2b_256(&event.canonical_bytes()));
    if expected != event.id {
        return Err(CryptoError::InvalidId(event.id.to_hex()));
    }
    if !verify_signature(event.id.as_bytes(), &event.sig, &event.pubkey) {
        return Err(CryptoError::InvalidSignature(event.id.to_hex()));
    }
    Ok(())
}
