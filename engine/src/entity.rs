//! The decrypted records handlers produce.

use std::fmt;
use std::sync::Arc;

use cosign_crypto::{Authenticator, KeyAuthenticator};
use cosign_store::entities::EVENT_ID;
use cosign_store::Entity;
use cosign_types::{
    ApprovedProposal, CompletedProposal, Contact, EventId, Kind, OwnedSigner, Policy, Profile,
    Proposal, PublicKey, PublishedLabel, SharedSigner, Timestamp,
};

/// A policy's shared key, as received through a grant event.
///
/// One live record per policy. The key itself signs and decrypts everything
/// scoped to the policy.
#[derive(Clone)]
pub struct SharedKey {
    /// Id of the grant event this key was decrypted from.
    pub id: EventId,
    pub policy_id: EventId,
    /// Author of the grant.
    pub creator: PublicKey,
    pub created_at: Timestamp,
    pub authenticator: Arc<KeyAuthenticator>,
}

impl SharedKey {
    pub fn public_key(&self) -> PublicKey {
        self.authenticator.public_key()
    }
}

impl PartialEq for SharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.policy_id == other.policy_id
            && self.creator == other.creator
            && self.public_key() == other.public_key()
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKey")
            .field("id", &self.id)
            .field("policy_id", &self.policy_id)
            .field("creator", &self.creator)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Entity for SharedKey {
    type Key = EventId;
    const NAME: &'static str = "shared_keys";
    const INDEXES: &'static [&'static str] = &[EVENT_ID];

    fn key(&self) -> EventId {
        self.policy_id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn index_value(&self, index: &str) -> Option<String> {
        (index == EVENT_ID).then(|| self.id.to_hex())
    }
}

/// Events a deletion removed from the local view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deleted {
    pub deletion_id: EventId,
    pub ids: Vec<EventId>,
}

/// Any record a handler can emit.
#[derive(Clone, Debug, PartialEq)]
pub enum DomainEntity {
    Policy(Policy),
    Proposal(Proposal),
    Approval(ApprovedProposal),
    Completed(CompletedProposal),
    SharedKey(SharedKey),
    OwnedSigner(OwnedSigner),
    SharedSigner(SharedSigner),
    Profile(Profile),
    Contacts(Vec<Contact>),
    Label(PublishedLabel),
    Deleted(Deleted),
}

impl DomainEntity {
    /// The event kind this record is decoded from.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Policy(_) => Kind::POLICY,
            Self::Proposal(_) => Kind::PROPOSAL,
            Self::Approval(_) => Kind::APPROVED_PROPOSAL,
            Self::Completed(_) => Kind::COMPLETED_PROPOSAL,
            Self::SharedKey(_) => Kind::SHARED_KEY,
            Self::OwnedSigner(_) => Kind::SIGNERS,
            Self::SharedSigner(_) => Kind::SHARED_SIGNERS,
            Self::Profile(_) => Kind::METADATA,
            Self::Contacts(_) => Kind::CONTACTS,
            Self::Label(_) => Kind::LABELS,
            Self::Deleted(_) => Kind::EVENT_DELETION,
        }
    }
}

/// Typed extraction from a [`DomainEntity`].
pub trait FromEntity: Sized {
    fn from_entity(entity: DomainEntity) -> Option<Self>;
}

macro_rules! from_entity {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for DomainEntity {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl FromEntity for $ty {
                fn from_entity(entity: DomainEntity) -> Option<Self> {
                    match entity {
                        DomainEntity::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_entity! {
    Policy => Policy,
    Proposal => Proposal,
    Approval => ApprovedProposal,
    Completed => CompletedProposal,
    SharedKey => SharedKey,
    OwnedSigner => OwnedSigner,
    SharedSigner => SharedSigner,
    Profile => Profile,
    Contacts => Vec<Contact>,
    Label => PublishedLabel,
    Deleted => Deleted,
}

/// Keep the entities of type `T`, dropping the rest.
pub fn collect<T: FromEntity>(entities: impl IntoIterator<Item = DomainEntity>) -> Vec<T> {
    entities.into_iter().filter_map(T::from_entity).collect()
}
