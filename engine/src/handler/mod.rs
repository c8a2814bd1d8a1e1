//! Per-kind event handlers.
//!
//! Each [`EventKindHandler`] turns raw events of one kind into cached domain
//! entities and knows how to delete them again. A handler serializes its own
//! ingest and delete calls behind a per-handler lock; handlers for different
//! kinds run independently.

mod approval;
mod completed;
mod deletion;
mod label;
mod policy;
mod profile;
mod proposal;
mod shared_key;
mod signer;

pub use approval::ApprovalHandler;
pub use completed::CompletedHandler;
pub use deletion::DeletionHandler;
pub use label::LabelHandler;
pub use policy::PolicyHandler;
pub use profile::{ContactsHandler, MetadataHandler};
pub use proposal::ProposalHandler;
pub use shared_key::SharedKeyHandler;
pub use signer::{OwnedSignerHandler, SharedSignerHandler};

use std::collections::HashSet;

use async_trait::async_trait;
use cosign_crypto::{Authenticator, EventBuilder};
use cosign_network::{Relay, RelayError, RelayPool};
use cosign_types::{Event, EventId, Kind, PublicKey, Tag};
use tokio::sync::Mutex;
use tracing::debug;

use crate::entity::DomainEntity;
use crate::stores::StoreSet;
use crate::EngineError;

#[async_trait]
pub trait EventKindHandler: Send + Sync {
    fn kind(&self) -> Kind;

    /// Held for the whole of every [`ingest`](Self::ingest),
    /// [`delete`](Self::delete) and [`purge`](Self::purge) call.
    fn lock(&self) -> &Mutex<()>;

    /// Decode `events`, cache what is new and return every resulting entity.
    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError>;

    /// Publish deletions for `ids` and drop local state for what was accepted.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError>;

    /// Drop local state for `ids` without publishing anything. Returns the
    /// ids actually removed.
    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError>;

    async fn ingest(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let _guard = self.lock().lock().await;
        self.handle(events).await
    }

    async fn delete(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        let _guard = self.lock().lock().await;
        self.remove(ids).await
    }

    /// Apply a deletion someone else already published.
    async fn purge(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let _guard = self.lock().lock().await;
        self.forget(ids).await
    }
}

/// Split a batch into entities already cached and events still to decode.
///
/// Repeated ids within the batch are decoded once.
pub(crate) fn split_cached<T>(
    stores: &StoreSet,
    events: Vec<Event>,
    lookup: impl Fn(&Event) -> Result<Option<T>, EngineError>,
) -> Result<(Vec<T>, Vec<Event>), EngineError> {
    let mut seen = HashSet::new();
    let mut cached = Vec::new();
    let mut fresh = Vec::new();
    for event in events {
        if !seen.insert(event.id) {
            continue;
        }
        if stores.cached_raw(&event)?.is_some() {
            if let Some(entity) = lookup(&event)? {
                cached.push(entity);
                continue;
            }
        }
        fresh.push(event);
    }
    Ok((cached, fresh))
}

/// A deletion event for `ids` of the given kinds, addressed to `participants`.
pub(crate) fn deletion_event(
    ids: &[EventId],
    kinds: impl IntoIterator<Item = Kind>,
    participants: &[PublicKey],
) -> EventBuilder {
    let mut kinds: Vec<Kind> = kinds.into_iter().collect();
    kinds.sort();
    kinds.dedup();
    EventBuilder::new(Kind::EVENT_DELETION, "")
        .tags(ids.iter().map(Tag::event))
        .tags(kinds.into_iter().map(Tag::kind))
        .tags(participants.iter().map(Tag::pubkey))
}

/// Publish a deletion for each of the caller's own events in `ids`, dropping
/// the local copy once accepted.
pub(crate) async fn delete_own<H: EventKindHandler + ?Sized>(
    handler: &H,
    authenticator: &dyn Authenticator,
    relay: &RelayPool,
    stores: &StoreSet,
    ids: Vec<EventId>,
) -> Result<(), EngineError> {
    let me = authenticator.public_key();
    let mut failures = DeleteFailures::default();
    for id in ids {
        let Some(raw) = stores.raw.get(&id)? else {
            continue;
        };
        if raw.pubkey != me {
            debug!(event = %id, kind = %raw.kind, "event authored by someone else");
            continue;
        }
        let deletion =
            deletion_event(&[id], [raw.kind], &raw.pubkey_refs()?).sign(authenticator);
        match relay.publish(&deletion).await {
            Ok(()) => {
                handler.forget(vec![id]).await?;
            }
            Err(err) => failures.record(&[id], &err),
        }
    }
    failures.into_result()
}

/// Deletions that could not be published.
#[derive(Debug, Default)]
pub(crate) struct DeleteFailures {
    failed: Vec<EventId>,
    reasons: Vec<String>,
}

impl DeleteFailures {
    pub(crate) fn record(&mut self, ids: &[EventId], err: &RelayError) {
        self.failed.extend_from_slice(ids);
        self.reasons.push(err.to_string());
    }

    pub(crate) fn into_result(self) -> Result<(), EngineError> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(EngineError::DeleteIncomplete {
                failed: self.failed,
                reasons: self.reasons,
            })
        }
    }
}
