use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::{Authenticator, AuthenticatorExt};
use cosign_network::{Relay, RelayPool};
use cosign_types::proposal::find_signer;
use cosign_types::{
    BitcoinUtil, Event, EventId, Kind, Proposal, ProposalContent, ProposalStatus, UNKNOWN_SIGNER,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{deletion_event, DeleteFailures, EventKindHandler};
use crate::entity::DomainEntity;
use crate::queries::SessionQueries;
use crate::stores::StoreSet;
use crate::EngineError;

/// Spending and proof-of-reserve proposals.
///
/// A proposal's status is derived from its approvals on every ingest. A
/// cached proposal whose status moved is replaced by an updated copy
/// without decrypting it again. Proposals with a known completion are
/// never cached again.
pub struct ProposalHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    bitcoin: Arc<dyn BitcoinUtil>,
    stores: Arc<StoreSet>,
    queries: Arc<dyn SessionQueries>,
    lock: Mutex<()>,
}

impl ProposalHandler {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        relay: RelayPool,
        bitcoin: Arc<dyn BitcoinUtil>,
        stores: Arc<StoreSet>,
        queries: Arc<dyn SessionQueries>,
    ) -> Self {
        Self {
            authenticator,
            relay,
            bitcoin,
            stores,
            queries,
            lock: Mutex::new(()),
        }
    }

    fn status_of(&self, proposal_id: &EventId) -> Result<ProposalStatus, EngineError> {
        Ok(ProposalStatus::from_signed(
            self.queries.is_fully_signed(proposal_id)?,
        ))
    }

    /// Fingerprints of the caller's signers, used to attribute proposals.
    async fn fingerprints(&self) -> Result<Vec<String>, EngineError> {
        Ok(self
            .queries
            .owned_signers()
            .await?
            .into_iter()
            .map(|s| s.signer.fingerprint)
            .collect())
    }
}

#[async_trait]
impl EventKindHandler for ProposalHandler {
    fn kind(&self) -> Kind {
        Kind::PROPOSAL
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let mut seen = HashSet::new();
        let mut statuses = HashMap::new();
        let mut out = Vec::new();
        let mut fresh = Vec::new();

        for event in events {
            if !seen.insert(event.id) {
                continue;
            }
            if self.queries.completed_by_proposal(&event.id)?.is_some() {
                debug!(proposal = %event.id, "proposal already completed, skipping");
                continue;
            }
            let status = self.status_of(&event.id)?;
            statuses.insert(event.id, status);

            let Some(cached) = self.stores.proposals.get(&event.id)? else {
                fresh.push(event);
                continue;
            };
            self.stores.cached_raw(&event)?;
            if cached.status == status {
                out.push(cached.into());
                continue;
            }
            debug!(proposal = %event.id, from = ?cached.status, to = ?status, "proposal status changed");
            let updated = cached.with_status(status);
            self.stores.proposals.delete([&cached])?;
            self.stores.proposals.store([updated.clone()])?;
            out.push(updated.into());
        }
        if fresh.is_empty() {
            return Ok(out);
        }

        let mut scoped = Vec::with_capacity(fresh.len());
        for event in fresh {
            match event.first_event_ref() {
                Ok(policy_id) => scoped.push((policy_id, event)),
                Err(err) => warn!(proposal = %event.id, error = %err, "proposal without policy"),
            }
        }
        let policy_ids: Vec<EventId> = scoped.iter().map(|(policy_id, _)| *policy_id).collect();
        let keys = self.queries.shared_keys(&policy_ids).await?;
        if !scoped.iter().any(|(policy_id, _)| keys.contains_key(policy_id)) {
            return Ok(out);
        }
        let fingerprints = self.fingerprints().await?;

        let mut proposals = Vec::new();
        let mut raws = Vec::new();
        for (policy_id, event) in scoped {
            let Some(key) = keys.get(&policy_id) else {
                debug!(proposal = %event.id, policy = %policy_id, "no shared key, skipping proposal");
                continue;
            };
            let content: ProposalContent = key.authenticator.decrypt_obj(&event.content)?;
            let signer = find_signer(fingerprints.iter().map(String::as_str), content.descriptor())
                .unwrap_or(UNKNOWN_SIGNER)
                .to_string();
            let fee = self.bitcoin.fee(content.psbt())?;
            let proposal = Proposal {
                proposal_id: event.id,
                policy_id,
                status: statuses
                    .get(&event.id)
                    .copied()
                    .unwrap_or(ProposalStatus::Unsigned),
                content,
                signer,
                fee,
                created_at: event.created_at,
            };
            proposals.push(proposal.clone());
            raws.push(event);
            out.push(proposal.into());
        }
        self.stores.proposals.store(proposals)?;
        self.stores.raw.store(raws)?;
        Ok(out)
    }

    /// Two deletion events per proposal: the proposal itself, signed by the
    /// shared key, and the caller's approvals of it, signed by the caller.
    /// Each one's local state goes only if that event was accepted.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        let me = self.authenticator.public_key();
        let mut failures = DeleteFailures::default();

        for proposal_id in ids {
            let Some(raw) = self.queries.raw_event(&proposal_id)? else {
                debug!(proposal = %proposal_id, "proposal not cached, nothing to delete");
                continue;
            };
            let policy_id = match self.stores.proposals.get(&proposal_id)? {
                Some(proposal) => proposal.policy_id,
                None => raw.first_event_ref()?,
            };
            let keys = self.queries.shared_keys(&[policy_id]).await?;
            let Some(key) = keys.get(&policy_id) else {
                warn!(proposal = %proposal_id, "no shared key, cannot delete proposal");
                continue;
            };
            let participants = raw.pubkey_refs()?;

            let proposal_deletion = deletion_event(&[proposal_id], [Kind::PROPOSAL], &participants)
                .sign(key.authenticator.as_ref());
            let own_approvals: Vec<EventId> = self
                .queries
                .approvals_by_proposal(&proposal_id)?
                .into_iter()
                .filter(|a| a.approved_by == me)
                .map(|a| a.approval_id)
                .collect();
            let approvals_deletion = (!own_approvals.is_empty()).then(|| {
                deletion_event(&own_approvals, [Kind::APPROVED_PROPOSAL], &participants)
                    .sign(self.authenticator.as_ref())
            });

            let (proposal_result, approvals_result) =
                tokio::join!(self.relay.publish(&proposal_deletion), async {
                    match &approvals_deletion {
                        Some(deletion) => Some(self.relay.publish(deletion).await),
                        None => None,
                    }
                });

            match proposal_result {
                Ok(()) => {
                    self.stores.proposals.delete_keys(&[proposal_id])?;
                    self.stores.forget_raw(&[proposal_id])?;
                }
                Err(err) => {
                    warn!(proposal = %proposal_id, error = %err, "proposal deletion rejected");
                    failures.record(&[proposal_id], &err);
                }
            }
            match approvals_result {
                Some(Ok(())) => {
                    self.queries
                        .handler(Kind::APPROVED_PROPOSAL)?
                        .purge(own_approvals)
                        .await?;
                }
                Some(Err(err)) => {
                    warn!(proposal = %proposal_id, error = %err, "approval deletion rejected");
                    failures.record(&own_approvals, &err);
                }
                None => {}
            }
        }
        failures.into_result()
    }

    /// Drops the proposals and, with them, every approval of them.
    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        let mut approvals = Vec::new();
        for proposal_id in ids {
            approvals.extend(
                self.queries
                    .approvals_by_proposal(&proposal_id)?
                    .into_iter()
                    .map(|a| a.approval_id),
            );
            if self.stores.proposals.delete_keys(&[proposal_id])? > 0 {
                removed.push(proposal_id);
            }
            self.stores.forget_raw(&[proposal_id])?;
        }
        self.queries
            .handler(Kind::APPROVED_PROPOSAL)?
            .purge(approvals)
            .await?;
        Ok(removed)
    }
}
