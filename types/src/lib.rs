//! Fundamental types for cosign.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! protocol events with their kinds and tags, keys, timestamps, the decrypted
//! policy entities, and the contract of the external Bitcoin utility.

pub mod approval;
pub mod bitcoin;
pub mod completed;
pub mod error;
pub mod event;
pub mod keys;
pub mod kind;
pub mod label;
pub mod policy;
pub mod profile;
pub mod proposal;
pub mod signer;
pub mod tag;
pub mod time;

pub use approval::{ApprovalContent, ApprovalStatus, ApprovedProposal};
pub use bitcoin::{BitcoinError, BitcoinUtil};
pub use completed::{CompletedContent, CompletedProposal, CompletedSpending};
pub use error::TypeError;
pub use event::{Event, UnsignedEvent};
pub use keys::{EventId, KeyPair, PrivateKey, PublicKey, Signature};
pub use kind::Kind;
pub use label::{Label, LabelData, PublishedLabel};
pub use policy::{Pagination, Policy, PolicyContent};
pub use profile::{Contact, ContactProfile, Metadata, Profile};
pub use proposal::{
    ProofOfReserveProposal, Proposal, ProposalContent, ProposalStatus, ProposalType,
    SpendingProposal, UNKNOWN_SIGNER,
};
pub use signer::{OwnedSigner, OwnedSignerContent, SharedSigner, SharedSignerContent};
pub use tag::{Tag, TagKind};
pub use time::{Clock, SystemClock, Timestamp};
