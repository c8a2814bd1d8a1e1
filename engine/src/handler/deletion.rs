use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cosign_types::{Event, EventId, Kind};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::EventKindHandler;
use crate::entity::{Deleted, DomainEntity};
use crate::queries::SessionQueries;
use crate::stores::StoreSet;
use crate::EngineError;

/// Deletion events published by anyone. Owns no store: each referenced
/// event is routed to the handler of its kind, which drops it locally.
///
/// A deletion only applies to events written by the deletion's own author,
/// and only to the kinds its `k` tags name (all kinds when it has none).
pub struct DeletionHandler {
    stores: Arc<StoreSet>,
    queries: Arc<dyn SessionQueries>,
    lock: Mutex<()>,
}

impl DeletionHandler {
    pub fn new(stores: Arc<StoreSet>, queries: Arc<dyn SessionQueries>) -> Self {
        Self {
            stores,
            queries,
            lock: Mutex::new(()),
        }
    }

    fn targets(&self, deletion: &Event) -> Result<BTreeMap<Kind, Vec<EventId>>, EngineError> {
        let mut targets: BTreeMap<Kind, Vec<EventId>> = BTreeMap::new();
        let (ids, kinds) = match (deletion.event_refs(), deletion.kind_refs()) {
            (Ok(ids), Ok(kinds)) => (ids, kinds),
            (Err(err), _) | (_, Err(err)) => {
                warn!(deletion = %deletion.id, error = %err, "malformed deletion tags");
                return Ok(targets);
            }
        };
        for id in ids {
            let Some(raw) = self.stores.raw.get(&id)? else {
                continue;
            };
            if raw.pubkey != deletion.pubkey {
                warn!(deletion = %deletion.id, event = %id, "deletion by someone other than the author ignored");
                continue;
            }
            if !kinds.is_empty() && !kinds.contains(&raw.kind) {
                debug!(deletion = %deletion.id, event = %id, kind = %raw.kind, "kind not covered by deletion");
                continue;
            }
            targets.entry(raw.kind).or_default().push(id);
        }
        Ok(targets)
    }
}

#[async_trait]
impl EventKindHandler for DeletionHandler {
    fn kind(&self) -> Kind {
        Kind::EVENT_DELETION
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for deletion in events {
            if !seen.insert(deletion.id) {
                continue;
            }
            let mut removed = Vec::new();
            for (kind, ids) in self.targets(&deletion)? {
                removed.extend(self.queries.handler(kind)?.purge(ids).await?);
            }
            if removed.is_empty() {
                continue;
            }
            debug!(deletion = %deletion.id, count = removed.len(), "applied deletion");
            out.push(DomainEntity::Deleted(Deleted {
                deletion_id: deletion.id,
                ids: removed,
            }));
        }
        Ok(out)
    }

    /// Deletion events are never themselves deleted, so there is nothing to
    /// publish.
    async fn remove(&self, _ids: Vec<EventId>) -> Result<(), EngineError> {
        Ok(())
    }

    /// Deletions are not cached, so there is nothing to forget.
    async fn forget(&self, _ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        Ok(Vec::new())
    }
}
