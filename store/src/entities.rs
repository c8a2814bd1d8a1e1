//! [`Entity`] implementations for the protocol's cached records.

use cosign_types::{
    ApprovedProposal, CompletedProposal, Event, EventId, OwnedSigner, Policy, Profile, Proposal,
    PublicKey, PublishedLabel, SharedSigner, Timestamp,
};

use crate::entity::Entity;

pub const POLICY_ID: &str = "policy_id";
pub const PROPOSAL_ID: &str = "proposal_id";
pub const APPROVED_BY: &str = "approved_by";
pub const OWNER: &str = "owner";
pub const EVENT_ID: &str = "event_id";

/// Raw events, kept so deletions can be authored against what was received.
impl Entity for Event {
    type Key = EventId;
    const NAME: &'static str = "events";

    fn key(&self) -> EventId {
        self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

impl Entity for Policy {
    type Key = EventId;
    const NAME: &'static str = "policies";

    fn key(&self) -> EventId {
        self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

impl Entity for Proposal {
    type Key = EventId;
    const NAME: &'static str = "proposals";
    const INDEXES: &'static [&'static str] = &[POLICY_ID];

    fn key(&self) -> EventId {
        self.proposal_id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn index_value(&self, index: &str) -> Option<String> {
        (index == POLICY_ID).then(|| self.policy_id.to_hex())
    }
}

impl Entity for ApprovedProposal {
    type Key = EventId;
    const NAME: &'static str = "approvals";
    const INDEXES: &'static [&'static str] = &[PROPOSAL_ID, POLICY_ID, APPROVED_BY];

    fn key(&self) -> EventId {
        self.approval_id
    }

    fn created_at(&self) -> Timestamp {
        self.approval_date
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            PROPOSAL_ID => Some(self.proposal_id.to_hex()),
            POLICY_ID => Some(self.policy_id.to_hex()),
            APPROVED_BY => Some(self.approved_by.to_hex()),
            _ => None,
        }
    }
}

impl Entity for CompletedProposal {
    type Key = EventId;
    const NAME: &'static str = "completed_proposals";
    const INDEXES: &'static [&'static str] = &[PROPOSAL_ID, POLICY_ID];

    fn key(&self) -> EventId {
        self.id
    }

    fn created_at(&self) -> Timestamp {
        self.completion_date
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            PROPOSAL_ID => Some(self.proposal_id.to_hex()),
            POLICY_ID => Some(self.policy_id.to_hex()),
            _ => None,
        }
    }
}

impl Entity for OwnedSigner {
    type Key = EventId;
    const NAME: &'static str = "owned_signers";

    fn key(&self) -> EventId {
        self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

impl Entity for SharedSigner {
    type Key = EventId;
    const NAME: &'static str = "shared_signers";
    const INDEXES: &'static [&'static str] = &[OWNER];

    fn key(&self) -> EventId {
        self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn index_value(&self, index: &str) -> Option<String> {
        (index == OWNER).then(|| self.owner.to_hex())
    }
}

/// Profiles are replaceable: one per public key.
impl Entity for Profile {
    type Key = PublicKey;
    const NAME: &'static str = "profiles";

    fn key(&self) -> PublicKey {
        self.public_key
    }

    fn created_at(&self) -> Timestamp {
        self.created_at.unwrap_or(Timestamp::EPOCH)
    }
}

/// Labels are replaceable: one per `d` identifier.
impl Entity for PublishedLabel {
    type Key = String;
    const NAME: &'static str = "labels";
    const INDEXES: &'static [&'static str] = &[POLICY_ID, EVENT_ID];

    fn key(&self) -> String {
        self.label_id.clone()
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            POLICY_ID => Some(self.policy_id.to_hex()),
            EVENT_ID => Some(self.id.to_hex()),
            _ => None,
        }
    }
}
