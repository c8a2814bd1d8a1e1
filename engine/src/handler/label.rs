use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::AuthenticatorExt;
use cosign_network::{Relay, RelayPool};
use cosign_store::entities::EVENT_ID;
use cosign_types::{Event, EventId, Kind, Label, PublishedLabel};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{deletion_event, DeleteFailures, EventKindHandler};
use crate::entity::DomainEntity;
use crate::queries::SessionQueries;
use crate::stores::StoreSet;
use crate::EngineError;

/// Address and UTXO labels of a policy.
///
/// Labels are replaceable per `d` identifier and encrypted to the policy's
/// shared key, which also signs them.
pub struct LabelHandler {
    relay: RelayPool,
    stores: Arc<StoreSet>,
    queries: Arc<dyn SessionQueries>,
    lock: Mutex<()>,
}

impl LabelHandler {
    pub fn new(relay: RelayPool, stores: Arc<StoreSet>, queries: Arc<dyn SessionQueries>) -> Self {
        Self {
            relay,
            stores,
            queries,
            lock: Mutex::new(()),
        }
    }

    fn by_event(&self, id: &EventId) -> Result<Option<PublishedLabel>, EngineError> {
        Ok(self.stores.labels.get_by(EVENT_ID, &id.to_hex())?)
    }
}

#[async_trait]
impl EventKindHandler for LabelHandler {
    fn kind(&self) -> Kind {
        Kind::LABELS
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut scoped = Vec::new();
        for event in events {
            if !seen.insert(event.id) {
                continue;
            }
            if self.stores.cached_raw(&event)?.is_some() {
                if let Some(label) = self.by_event(&event.id)? {
                    out.push(label.into());
                    continue;
                }
            }
            let Some(label_id) = event.identifier().map(str::to_string) else {
                warn!(label = %event.id, "label without identifier");
                continue;
            };
            match event.first_event_ref() {
                Ok(policy_id) => scoped.push((label_id, policy_id, event)),
                Err(err) => warn!(label = %event.id, error = %err, "label without policy"),
            }
        }
        if scoped.is_empty() {
            return Ok(out);
        }

        let policy_ids: Vec<EventId> = scoped.iter().map(|(_, policy_id, _)| *policy_id).collect();
        let keys = self.queries.shared_keys(&policy_ids).await?;
        for (label_id, policy_id, event) in scoped {
            let Some(key) = keys.get(&policy_id) else {
                debug!(label = %event.id, "no shared key, skipping label");
                continue;
            };
            if let Some(current) = self.stores.labels.get(&label_id)? {
                if current.created_at >= event.created_at {
                    out.push(current.into());
                    continue;
                }
                self.stores.forget_raw(&[current.id])?;
            }
            let label: Label = key.authenticator.decrypt_obj(&event.content)?;
            let published = PublishedLabel {
                id: event.id,
                label_id,
                policy_id,
                label,
                created_at: event.created_at,
            };
            self.stores.labels.store([published.clone()])?;
            self.stores.raw.store([event])?;
            out.push(published.into());
        }
        Ok(out)
    }

    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        let mut failures = DeleteFailures::default();
        for id in ids {
            let (Some(label), Some(raw)) = (self.by_event(&id)?, self.stores.raw.get(&id)?) else {
                continue;
            };
            let keys = self.queries.shared_keys(&[label.policy_id]).await?;
            let Some(key) = keys.get(&label.policy_id) else {
                warn!(label = %id, "no shared key, cannot delete label");
                continue;
            };
            let deletion = deletion_event(&[id], [Kind::LABELS], &raw.pubkey_refs()?)
                .sign(key.authenticator.as_ref());
            match self.relay.publish(&deletion).await {
                Ok(()) => {
                    self.forget(vec![id]).await?;
                }
                Err(err) => failures.record(&[id], &err),
            }
        }
        failures.into_result()
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            if let Some(label) = self.by_event(&id)? {
                self.stores.labels.delete_keys(&[label.label_id])?;
                removed.push(id);
            }
            self.stores.forget_raw(&[id])?;
        }
        Ok(removed)
    }
}
