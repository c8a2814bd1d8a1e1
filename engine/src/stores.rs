//! The per-session set of entity stores.

use std::sync::atomic::{AtomicBool, Ordering};

use cosign_store::EntityStore;
use cosign_types::{
    ApprovedProposal, CompletedProposal, Event, EventId, OwnedSigner, Policy, Profile, Proposal,
    PublishedLabel, SharedSigner,
};

use crate::entity::SharedKey;
use crate::EngineError;

/// Every cache a session keeps. Each handler writes only its own stores;
/// `raw` is shared and holds the event behind every cached entity.
#[derive(Default)]
pub struct StoreSet {
    pub raw: EntityStore<Event>,
    pub policies: EntityStore<Policy>,
    pub proposals: EntityStore<Proposal>,
    pub approvals: EntityStore<ApprovedProposal>,
    pub completed: EntityStore<CompletedProposal>,
    pub shared_keys: EntityStore<SharedKey>,
    pub owned_signers: EntityStore<OwnedSigner>,
    pub shared_signers: EntityStore<SharedSigner>,
    pub profiles: EntityStore<Profile>,
    pub labels: EntityStore<PublishedLabel>,
    owned_signers_loaded: AtomicBool,
}

impl StoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached copy of `event`, if any.
    ///
    /// An event seen again under the same id must carry the same content;
    /// anything else means the cache or the event was tampered with.
    pub fn cached_raw(&self, event: &Event) -> Result<Option<Event>, EngineError> {
        match self.raw.get(&event.id)? {
            Some(cached) if cached.content != event.content => {
                Err(EngineError::IntegrityMismatch { event: event.id })
            }
            cached => Ok(cached),
        }
    }

    pub fn forget_raw(&self, ids: &[EventId]) -> Result<(), EngineError> {
        self.raw.delete_keys(ids)?;
        Ok(())
    }

    pub(crate) fn owned_signers_loaded(&self) -> bool {
        self.owned_signers_loaded.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_owned_signers_loaded(&self) {
        self.owned_signers_loaded.store(true, Ordering::SeqCst);
    }
}
