//! Batch dispatch of mixed event streams.
//!
//! A batch is grouped by kind and fed to the handlers in
//! [`Kind::DISPATCH_ORDER`], so shared keys are known before the policies
//! they unlock and approvals before the proposals whose status they decide.
//! Every kind is an independent unit: one failing does not stop the rest.

use std::collections::{BTreeMap, HashSet};

use cosign_crypto::verify_event;
use cosign_types::{Event, EventId, Kind};
use tracing::{debug, warn};

use crate::entity::{DomainEntity, FromEntity};
use crate::session::SessionCore;
use crate::EngineError;

/// A kind whose batch could not be processed.
#[derive(Debug)]
pub struct SyncFailure {
    pub kind: Kind,
    pub error: EngineError,
}

/// Outcome of [`Session::sync`](crate::Session::sync).
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Entities produced, in dispatch order.
    pub entities: Vec<DomainEntity>,
    pub failures: Vec<SyncFailure>,
    /// Events dropped because their id or signature did not verify.
    pub rejected: Vec<EventId>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }

    /// Copies of the produced entities of type `T`.
    pub fn of<T: FromEntity>(&self) -> Vec<T> {
        self.entities
            .iter()
            .cloned()
            .filter_map(T::from_entity)
            .collect()
    }
}

impl SessionCore {
    /// Drop events that fail verification, when verification is enabled.
    pub(crate) fn verified(&self, events: Vec<Event>, rejected: &mut Vec<EventId>) -> Vec<Event> {
        if !self.config.verify_events {
            return events;
        }
        events
            .into_iter()
            .filter(|event| match verify_event(event) {
                Ok(()) => true,
                Err(err) => {
                    warn!(event = %event.id, kind = %event.kind, error = %err, "dropping unverifiable event");
                    rejected.push(event.id);
                    false
                }
            })
            .collect()
    }

    pub(crate) async fn dispatch(
        &self,
        kind: Kind,
        events: Vec<Event>,
    ) -> Result<Vec<DomainEntity>, EngineError> {
        self.registry.get_handler(kind)?.ingest(events).await
    }

    pub(crate) async fn sync(&self, events: Vec<Event>) -> SyncReport {
        let mut report = SyncReport::default();
        let events = self.verified(events, &mut report.rejected);

        let mut groups: BTreeMap<Kind, Vec<Event>> = BTreeMap::new();
        for event in events {
            groups.entry(event.kind).or_default().push(event);
        }
        debug!(kinds = groups.len(), "dispatching batch");

        for kind in Kind::DISPATCH_ORDER {
            let Some(batch) = groups.remove(&kind) else {
                continue;
            };
            match self.dispatch(kind, batch).await {
                Ok(entities) => {
                    if kind == Kind::APPROVED_PROPOSAL {
                        if let Err(error) = self.queue_status_refresh(&entities, &mut groups) {
                            report.failures.push(SyncFailure { kind, error });
                        }
                    }
                    report.entities.extend(entities);
                }
                Err(error) => {
                    warn!(%kind, %error, "batch failed");
                    report.failures.push(SyncFailure { kind, error });
                }
            }
        }

        for (kind, batch) in groups {
            let error = match self.registry.get_handler(kind) {
                Err(error) => error,
                Ok(_) => continue,
            };
            warn!(%kind, count = batch.len(), "no handler for events");
            report.failures.push(SyncFailure { kind, error });
        }
        report
    }

    /// Re-run cached proposals touched by new approvals through the proposal
    /// handler so their status follows.
    fn queue_status_refresh(
        &self,
        approvals: &[DomainEntity],
        groups: &mut BTreeMap<Kind, Vec<Event>>,
    ) -> Result<(), EngineError> {
        let mut touched = HashSet::new();
        for entity in approvals {
            if let DomainEntity::Approval(approval) = entity {
                touched.insert(approval.proposal_id);
            }
        }
        let batch = groups.entry(Kind::PROPOSAL).or_default();
        touched.retain(|id| !batch.iter().any(|e| e.id == *id));
        for id in touched {
            if !self.stores.proposals.contains(&id)? {
                continue;
            }
            if let Some(raw) = self.stores.raw.get(&id)? {
                batch.push(raw);
            }
        }
        if batch.is_empty() {
            groups.remove(&Kind::PROPOSAL);
        }
        Ok(())
    }
}
