use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::{Authenticator, AuthenticatorExt};
use cosign_network::RelayPool;
use cosign_types::{
    BitcoinUtil, CompletedContent, CompletedProposal, Event, EventId, Kind,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{delete_own, split_cached, EventKindHandler};
use crate::entity::DomainEntity;
use crate::queries::SessionQueries;
use crate::stores::StoreSet;
use crate::EngineError;

/// Finalized proposals. Ingesting one retires the proposal it completes,
/// together with that proposal's approvals.
pub struct CompletedHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    bitcoin: Arc<dyn BitcoinUtil>,
    stores: Arc<StoreSet>,
    queries: Arc<dyn SessionQueries>,
    lock: Mutex<()>,
}

impl CompletedHandler {
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

    fn scope(&self, event: &Event) -> Result<Option<(EventId, EventId)>, EngineError> {
        let refs = match event.event_refs() {
            Ok(refs) => refs,
            Err(err) => {
                warn!(completed = %event.id, error = %err, "malformed completed proposal tags");
                return Ok(None);
            }
        };
        let Some(&proposal_id) = refs.first() else {
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
impl EventKindHandler for CompletedHandler {
    fn kind(&self) -> Kind {
        Kind::COMPLETED_PROPOSAL
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let (cached, fresh) = split_cached(&self.stores, events, |e| {
            Ok(self.stores.completed.get(&e.id)?)
        })?;
        let mut out: Vec<DomainEntity> = cached.into_iter().map(DomainEntity::from).collect();

        let mut scoped = Vec::new();
        for event in fresh {
            match self.scope(&event)? {
                Some((proposal_id, policy_id)) => scoped.push((proposal_id, policy_id, event)),
                None => debug!(completed = %event.id, "completed proposal scope unknown"),
            }
        }
        if scoped.is_empty() {
            return Ok(out);
        }
        let policy_ids: Vec<EventId> = scoped.iter().map(|(_, policy_id, _)| *policy_id).collect();
        let keys = self.queries.shared_keys(&policy_ids).await?;

        let mut completed = Vec::new();
        let mut raws = Vec::new();
        let mut retired = Vec::new();
        for (proposal_id, policy_id, event) in scoped {
            let Some(key) = keys.get(&policy_id) else {
                debug!(completed = %event.id, "no shared key, skipping completed proposal");
                continue;
            };
            let content: CompletedContent = key.authenticator.decrypt_obj(&event.content)?;
            let tx_id = match &content {
                CompletedContent::Spending(spending) => Some(self.bitcoin.tx_id(&spending.tx)?),
                CompletedContent::ProofOfReserve(_) => None,
            };
            let record = CompletedProposal {
                id: event.id,
                proposal_id,
                policy_id,
                completed_by: event.pubkey,
                completion_date: event.created_at,
                content,
                tx_id,
            };
            retired.push(proposal_id);
            completed.push(record.clone());
            raws.push(event);
            out.push(record.into());
        }
        self.stores.completed.store(completed)?;
        self.stores.raw.store(raws)?;

        let retired = self.queries.handler(Kind::PROPOSAL)?.purge(retired).await?;
        if !retired.is_empty() {
            info!(count = retired.len(), "retired completed proposals");
        }
        Ok(out)
    }

    /// Only the completer can delete a completion record.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.stores.completed.delete_keys(&[id])? > 0 {
                removed.push(id);
            }
        }
        self.stores.forget_raw(&removed)?;
        Ok(removed)
    }
}
