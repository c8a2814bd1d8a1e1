use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::{Authenticator, AuthenticatorExt};
use cosign_network::RelayPool;
use cosign_types::{
    ApprovalContent, ApprovalStatus, ApprovedProposal, Clock, Event, EventId, Kind,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{delete_own, EventKindHandler};
use crate::entity::DomainEntity;
use crate::queries::SessionQueries;
use crate::stores::StoreSet;
use crate::EngineError;

/// Approvals: a participant's signed PSBT for a proposal.
///
/// Approval events are signed by the approver and encrypted to the policy's
/// shared key. They carry `e` tags for the proposal then the policy, and an
/// expiration after which the approval stops counting.
pub struct ApprovalHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    clock: Arc<dyn Clock>,
    stores: Arc<StoreSet>,
    queries: Arc<dyn SessionQueries>,
    ttl_secs: u64,
    lock: Mutex<()>,
}

impl ApprovalHandler {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        relay: RelayPool,
        clock: Arc<dyn Clock>,
        stores: Arc<StoreSet>,
        queries: Arc<dyn SessionQueries>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            authenticator,
            relay,
            clock,
            stores,
            queries,
            ttl_secs,
            lock: Mutex::new(()),
        }
    }

    /// `(proposal, policy)` an approval refers to. Events tagged with the
    /// proposal only fall back to the cached proposal's policy.
    fn scope(&self, event: &Event) -> Result<Option<(EventId, EventId)>, EngineError> {
        let refs = match event.event_refs() {
            Ok(refs) => refs,
            Err(err) => {
                warn!(approval = %event.id, error = %err, "malformed approval tags");
                return Ok(None);
            }
        };
        let Some(&proposal_id) = refs.first() else {
            warn!(approval = %event.id, "approval without proposal");
            return Ok(None);
        };
        let policy_id = match refs.get(1) {
            Some(&policy_id) => Some(policy_id),
            None => self.queries.proposal(&proposal_id)?.map(|p| p.policy_id),
        };
        Ok(policy_id.map(|policy_id| (proposal_id, policy_id)))
    }
}

#[async_trait]
impl EventKindHandler for ApprovalHandler {
    fn kind(&self) -> Kind {
        Kind::APPROVED_PROPOSAL
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let now = self.clock.now();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut scoped = Vec::new();

        for event in events {
            if !seen.insert(event.id) {
                continue;
            }
            if let Some(cached) = self.stores.approvals.get(&event.id)? {
                self.stores.cached_raw(&event)?;
                let status = ApprovalStatus::at(cached.expiration_date, now);
                if cached.status == status {
                    out.push(cached.into());
                } else {
                    let updated = cached.with_status(status);
                    self.stores.approvals.store([updated.clone()])?;
                    out.push(updated.into());
                }
                continue;
            }
            match self.scope(&event)? {
                Some((proposal_id, policy_id)) => scoped.push((proposal_id, policy_id, event)),
                None => debug!(approval = %event.id, "approval scope unknown, skipping"),
            }
        }
        if scoped.is_empty() {
            return Ok(out);
        }

        let policy_ids: Vec<EventId> = scoped.iter().map(|(_, policy_id, _)| *policy_id).collect();
        let keys = self.queries.shared_keys(&policy_ids).await?;

        let mut approvals = Vec::new();
        let mut raws = Vec::new();
        for (proposal_id, policy_id, event) in scoped {
            let Some(key) = keys.get(&policy_id) else {
                debug!(approval = %event.id, "no shared key, skipping approval");
                continue;
            };
            let content: ApprovalContent = key.authenticator.decrypt_obj(&event.content)?;
            let expiration_date = event
                .expiration()?
                .unwrap_or_else(|| event.created_at.plus_secs(self.ttl_secs));
            let approval = ApprovedProposal {
                approval_id: event.id,
                proposal_id,
                policy_id,
                proposal_type: content.proposal_type(),
                psbt: content.into_psbt(),
                approved_by: event.pubkey,
                approval_date: event.created_at,
                expiration_date,
                status: ApprovalStatus::at(expiration_date, now),
            };
            approvals.push(approval.clone());
            raws.push(event);
            out.push(approval.into());
        }
        self.stores.approvals.store(approvals)?;
        self.stores.raw.store(raws)?;
        Ok(out)
    }

    /// Only the approver can delete an approval; others' ids are skipped.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.stores.approvals.delete_keys(&[id])? > 0 {
                removed.push(id);
            }
        }
        self.stores.forget_raw(&removed)?;
        Ok(removed)
    }
}
