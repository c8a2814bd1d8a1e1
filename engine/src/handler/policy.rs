use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::{Authenticator, AuthenticatorExt};
use cosign_network::{Filter, Relay, RelayPool};
use cosign_types::{BitcoinUtil, Event, EventId, Kind, Policy, PolicyContent};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{deletion_event, split_cached, DeleteFailures, EventKindHandler};
use crate::entity::DomainEntity;
use crate::queries::SessionQueries;
use crate::stores::StoreSet;
use crate::EngineError;

/// Policies: the root of every other policy-scoped record.
///
/// Content is encrypted to the policy's shared key, so only participants
/// holding a grant can decode it.
pub struct PolicyHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    bitcoin: Arc<dyn BitcoinUtil>,
    stores: Arc<StoreSet>,
    queries: Arc<dyn SessionQueries>,
    lock: Mutex<()>,
}

impl PolicyHandler {
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

    /// Grants the caller issued for `policy_id`, as seen by the relays.
    async fn own_grants(&self, policy_id: EventId) -> Result<Vec<EventId>, EngineError> {
        let filter = Filter::new()
            .kind(Kind::SHARED_KEY)
            .author(self.authenticator.public_key())
            .events([policy_id]);
        Ok(self.relay.list(&[filter]).await?.into_iter().map(|e| e.id).collect())
    }

    /// Drops a policy and everything scoped to it, except the records in
    /// `keep`. Those are the caller's own records whose deletion the relays
    /// refused, so they stay cached until a later delete goes through.
    async fn forget_policy(
        &self,
        policy_id: EventId,
        keep: &HashSet<EventId>,
    ) -> Result<bool, EngineError> {
        let kept = |ids: Vec<EventId>| -> Vec<EventId> {
            ids.into_iter().filter(|id| !keep.contains(id)).collect()
        };

        let proposals: Vec<EventId> = self
            .queries
            .proposals_by_policy(&policy_id)?
            .into_iter()
            .map(|p| p.proposal_id)
            .collect();
        if !proposals.is_empty() {
            let handler = self.queries.handler(Kind::PROPOSAL)?;
            let _guard = handler.lock().lock().await;
            self.stores.proposals.delete_keys(&proposals)?;
            self.stores.forget_raw(&proposals)?;
        }

        let approvals = kept(
            self.queries
                .approvals_by_policy(&policy_id)?
                .into_iter()
                .map(|a| a.approval_id)
                .collect(),
        );
        self.queries
            .handler(Kind::APPROVED_PROPOSAL)?
            .purge(approvals)
            .await?;

        let completed = kept(
            self.queries
                .completed_by_policy(&policy_id)?
                .into_iter()
                .map(|c| c.id)
                .collect(),
        );
        self.queries
            .handler(Kind::COMPLETED_PROPOSAL)?
            .purge(completed)
            .await?;

        let labels: Vec<EventId> = self
            .queries
            .labels_by_policy(&policy_id)?
            .into_iter()
            .map(|l| l.id)
            .collect();
        self.queries.handler(Kind::LABELS)?.purge(labels).await?;

        if let Some(key) = self.stores.shared_keys.get(&policy_id)? {
            if !keep.contains(&key.id) {
                self.queries.handler(Kind::SHARED_KEY)?.purge(vec![key.id]).await?;
            }
        }

        let removed = self.stores.policies.delete_keys(&[policy_id])?;
        self.stores.forget_raw(&[policy_id])?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl EventKindHandler for PolicyHandler {
    fn kind(&self) -> Kind {
        Kind::POLICY
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let (cached, fresh) = split_cached(&self.stores, events, |e| {
            Ok(self.stores.policies.get(&e.id)?)
        })?;
        let mut out: Vec<DomainEntity> = cached.into_iter().map(DomainEntity::from).collect();
        if fresh.is_empty() {
            return Ok(out);
        }

        let ids: Vec<EventId> = fresh.iter().map(|e| e.id).collect();
        let keys = self.queries.shared_keys(&ids).await?;

        let mut policies = Vec::new();
        let mut raws = Vec::new();
        for event in fresh {
            let Some(key) = keys.get(&event.id) else {
                debug!(policy = %event.id, "no shared key, skipping policy");
                continue;
            };
            let content: PolicyContent = key.authenticator.decrypt_obj(&event.content)?;
            let miniscript = self.bitcoin.to_miniscript(&content.descriptor).ok();
            let policy = Policy::from_content(
                event.id,
                content,
                miniscript,
                event.pubkey_refs()?,
                event.created_at,
            );
            policies.push(policy.clone());
            raws.push(event);
            out.push(policy.into());
        }
        self.stores.policies.store(policies)?;
        self.stores.raw.store(raws)?;
        Ok(out)
    }

    /// Deleting a policy takes everything scoped to it along.
    ///
    /// Two deletion events go out per policy: one signed by the shared key
    /// for the records it authored (policy, proposals, labels), one signed by
    /// the caller for the caller's approvals, completions and grants. Local
    /// state is dropped only for the events whose deletion was accepted.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        let me = self.authenticator.public_key();
        let mut failures = DeleteFailures::default();

        for policy_id in ids {
            let Some(raw) = self.queries.raw_event(&policy_id)? else {
                debug!(policy = %policy_id, "policy not cached, nothing to delete");
                continue;
            };
            let keys = self.queries.shared_keys(&[policy_id]).await?;
            let Some(key) = keys.get(&policy_id) else {
                warn!(policy = %policy_id, "no shared key, cannot delete policy");
                continue;
            };
            let participants = raw.pubkey_refs()?;

            let mut shared_ids = vec![policy_id];
            shared_ids.extend(
                self.queries
                    .proposals_by_policy(&policy_id)?
                    .iter()
                    .map(|p| p.proposal_id),
            );
            shared_ids.extend(self.queries.labels_by_policy(&policy_id)?.iter().map(|l| l.id));
            let shared_deletion = deletion_event(
                &shared_ids,
                [Kind::POLICY, Kind::PROPOSAL, Kind::LABELS],
                &participants,
            )
            .sign(key.authenticator.as_ref());

            let own_approvals: Vec<EventId> = self
                .queries
                .approvals_by_policy(&policy_id)?
                .into_iter()
                .filter(|a| a.approved_by == me)
                .map(|a| a.approval_id)
                .collect();
            let own_completed: Vec<EventId> = self
                .queries
                .completed_by_policy(&policy_id)?
                .into_iter()
                .filter(|c| c.completed_by == me)
                .map(|c| c.id)
                .collect();
            let mut own_ids = own_approvals.clone();
            own_ids.extend(&own_completed);
            own_ids.extend(self.own_grants(policy_id).await?);
            let own_deletion = (!own_ids.is_empty()).then(|| {
                deletion_event(
                    &own_ids,
                    [Kind::APPROVED_PROPOSAL, Kind::COMPLETED_PROPOSAL, Kind::SHARED_KEY],
                    &participants,
                )
                .sign(self.authenticator.as_ref())
            });

            let (shared_result, own_result) = tokio::join!(self.relay.publish(&shared_deletion), async {
                match &own_deletion {
                    Some(deletion) => Some(self.relay.publish(deletion).await),
                    None => None,
                }
            });

            let mut keep = HashSet::new();
            match own_result {
                Some(Ok(())) => {
                    self.queries
                        .handler(Kind::APPROVED_PROPOSAL)?
                        .purge(own_approvals)
                        .await?;
                    self.queries
                        .handler(Kind::COMPLETED_PROPOSAL)?
                        .purge(own_completed)
                        .await?;
                }
                Some(Err(err)) => {
                    warn!(policy = %policy_id, error = %err, "own records of policy not deleted");
                    failures.record(&own_ids, &err);
                    keep.extend(own_ids.iter().copied());
                }
                None => {}
            }
            match shared_result {
                Ok(()) => {
                    self.forget_policy(policy_id, &keep).await?;
                    info!(policy = %policy_id, "policy deleted");
                }
                Err(err) => {
                    warn!(policy = %policy_id, error = %err, "policy deletion rejected");
                    failures.record(&shared_ids, &err);
                }
            }
        }
        failures.into_result()
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for policy_id in ids {
            if self.forget_policy(policy_id, &HashSet::new()).await? {
                removed.push(policy_id);
            }
        }
        Ok(removed)
    }
}
