//! Read-only view of the session that handlers use to reach each other.
//!
//! Handlers never hold one another directly. Anything outside their own
//! stores goes through [`SessionQueries`], which the session implements
//! over a weak reference to itself.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use cosign_crypto::Authenticator;
use cosign_network::{Filter, Relay};
use cosign_store::entities::{POLICY_ID, PROPOSAL_ID};
use cosign_types::{
    ApprovalStatus, ApprovedProposal, CompletedProposal, Event, EventId, Kind, OwnedSigner, Policy,
    Proposal, PublishedLabel,
};
use tracing::debug;

use crate::entity::SharedKey;
use crate::handler::EventKindHandler;
use crate::session::SessionCore;
use crate::EngineError;

#[async_trait]
pub trait SessionQueries: Send + Sync {
    /// Shared keys the caller holds for `policy_ids`, fetching missing ones.
    async fn shared_keys(
        &self,
        policy_ids: &[EventId],
    ) -> Result<HashMap<EventId, SharedKey>, EngineError>;

    /// Whether the active approvals of a proposal combine into a complete
    /// signature set.
    fn is_fully_signed(&self, proposal_id: &EventId) -> Result<bool, EngineError>;

    /// The caller's signers, loaded from the network on first use.
    async fn owned_signers(&self) -> Result<Vec<OwnedSigner>, EngineError>;

    fn policy(&self, policy_id: &EventId) -> Result<Option<Policy>, EngineError>;

    fn proposal(&self, proposal_id: &EventId) -> Result<Option<Proposal>, EngineError>;

    fn proposals_by_policy(&self, policy_id: &EventId) -> Result<Vec<Proposal>, EngineError>;

    fn approvals_by_proposal(
        &self,
        proposal_id: &EventId,
    ) -> Result<Vec<ApprovedProposal>, EngineError>;

    fn approvals_by_policy(&self, policy_id: &EventId)
        -> Result<Vec<ApprovedProposal>, EngineError>;

    fn completed_by_policy(&self, policy_id: &EventId)
        -> Result<Vec<CompletedProposal>, EngineError>;

    /// The completion record of a proposal, if it has been broadcast.
    fn completed_by_proposal(
        &self,
        proposal_id: &EventId,
    ) -> Result<Option<CompletedProposal>, EngineError>;

    fn labels_by_policy(&self, policy_id: &EventId) -> Result<Vec<PublishedLabel>, EngineError>;

    /// The cached event an entity was decoded from.
    fn raw_event(&self, id: &EventId) -> Result<Option<Event>, EngineError>;

    fn handler(&self, kind: Kind) -> Result<Arc<dyn EventKindHandler>, EngineError>;
}

/// [`SessionQueries`] over a session that may already be gone.
pub(crate) struct SessionHandle {
    core: Weak<SessionCore>,
}

impl SessionHandle {
    pub(crate) fn new(core: Weak<SessionCore>) -> Self {
        Self { core }
    }

    fn core(&self) -> Result<Arc<SessionCore>, EngineError> {
        self.core.upgrade().ok_or(EngineError::SessionClosed)
    }
}

#[async_trait]
impl SessionQueries for SessionHandle {
    async fn shared_keys(
        &self,
        policy_ids: &[EventId],
    ) -> Result<HashMap<EventId, SharedKey>, EngineError> {
        self.core()?.resolver.resolve(policy_ids).await
    }

    fn is_fully_signed(&self, proposal_id: &EventId) -> Result<bool, EngineError> {
        let core = self.core()?;
        let now = core.clock.now();
        let psbts: Vec<String> = self
            .approvals_by_proposal(proposal_id)?
            .into_iter()
            .filter(|a| ApprovalStatus::at(a.expiration_date, now) == ApprovalStatus::Active)
            .map(|a| a.psbt)
            .collect();
        if psbts.is_empty() {
            return Ok(false);
        }
        Ok(core.bitcoin.is_fully_signed(&psbts)?)
    }

    async fn owned_signers(&self) -> Result<Vec<OwnedSigner>, EngineError> {
        let core = self.core()?;
        if !core.stores.owned_signers_loaded() {
            let filter = Filter::new()
                .kind(Kind::SIGNERS)
                .author(core.authenticator.public_key());
            let events = core.relay.list(&[filter]).await?;
            debug!(count = events.len(), "loading owned signers");
            core.registry.get_handler(Kind::SIGNERS)?.ingest(events).await?;
            core.stores.mark_owned_signers_loaded();
        }
        Ok(core.stores.owned_signers.list()?)
    }

    fn policy(&self, policy_id: &EventId) -> Result<Option<Policy>, EngineError> {
        Ok(self.core()?.stores.policies.get(policy_id)?)
    }

    fn proposal(&self, proposal_id: &EventId) -> Result<Option<Proposal>, EngineError> {
        Ok(self.core()?.stores.proposals.get(proposal_id)?)
    }

    fn proposals_by_policy(&self, policy_id: &EventId) -> Result<Vec<Proposal>, EngineError> {
        Ok(self
            .core()?
            .stores
            .proposals
            .get_all_by(POLICY_ID, &policy_id.to_hex())?)
    }

    fn approvals_by_proposal(
        &self,
        proposal_id: &EventId,
    ) -> Result<Vec<ApprovedProposal>, EngineError> {
        Ok(self
            .core()?
            .stores
            .approvals
            .get_all_by(PROPOSAL_ID, &proposal_id.to_hex())?)
    }

    fn approvals_by_policy(
        &self,
        policy_id: &EventId,
    ) -> Result<Vec<ApprovedProposal>, EngineError> {
        Ok(self
            .core()?
            .stores
            .approvals
            .get_all_by(POLICY_ID, &policy_id.to_hex())?)
    }

    fn completed_by_policy(
        &self,
        policy_id: &EventId,
    ) -> Result<Vec<CompletedProposal>, EngineError> {
        Ok(self
            .core()?
            .stores
            .completed
            .get_all_by(POLICY_ID, &policy_id.to_hex())?)
    }

    fn completed_by_proposal(
        &self,
        proposal_id: &EventId,
    ) -> Result<Option<CompletedProposal>, EngineError> {
        Ok(self
            .core()?
            .stores
            .completed
            .get_by(PROPOSAL_ID, &proposal_id.to_hex())?)
    }

    fn labels_by_policy(&self, policy_id: &EventId) -> Result<Vec<PublishedLabel>, EngineError> {
        Ok(self
            .core()?
            .stores
            .labels
            .get_all_by(POLICY_ID, &policy_id.to_hex())?)
    }

    fn raw_event(&self, id: &EventId) -> Result<Option<Event>, EngineError> {
        Ok(self.core()?.stores.raw.get(id)?)
    }

    fn handler(&self, kind: Kind) -> Result<Arc<dyn EventKindHandler>, EngineError> {
        self.core()?.registry.get_handler(kind)
    }
}
