//! A set of relays presented as one.
//!
//! Publishing resolves on the first acknowledgment and fails only once every
//! relay rejected. Listing merges all relays' answers, dropping duplicates.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use cosign_types::{Event, EventId};
use futures_util::future::join_all;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dedup::EventDedup;
use crate::error::RelayError;
use crate::filter::Filter;
use crate::relay::{Relay, FEED_CAPACITY};

/// Outcome of publishing several independent events.
#[derive(Debug, Default)]
pub struct BroadcastResult {
    /// Events at least one relay acknowledged.
    pub published: Vec<EventId>,
    /// Events every relay rejected.
    pub failed: Vec<(EventId, RelayError)>,
}

impl BroadcastResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct RelayPool {
    relays: Vec<Arc<dyn Relay>>,
}

impl RelayPool {
    pub fn new(relays: Vec<Arc<dyn Relay>>) -> Self {
        Self { relays }
    }

    pub fn relays(&self) -> &[Arc<dyn Relay>] {
        &self.relays
    }

    /// Publish independent events concurrently. One event failing does not
    /// affect the others.
    pub async fn broadcast(&self, events: &[Event]) -> BroadcastResult {
        let outcomes = join_all(events.iter().map(|e| async move { (e.id, self.publish(e).await) })).await;
        let mut result = BroadcastResult::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.published.push(id),
                Err(err) => result.failed.push((id, err)),
            }
        }
        result
    }
}

#[async_trait]
impl Relay for RelayPool {
    fn url(&self) -> &str {
        "pool"
    }

    async fn list(&self, filters: &[Filter]) -> Result<Vec<Event>, RelayError> {
        if self.relays.is_empty() {
            return Err(RelayError::NoRelays);
        }
        let answers = join_all(self.relays.iter().map(|r| r.list(filters))).await;

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        let mut last_err = None;
        let mut any_ok = false;
        for (relay, answer) in self.relays.iter().zip(answers) {
            match answer {
                Ok(events) => {
                    any_ok = true;
                    merged.extend(events.into_iter().filter(|e| seen.insert(e.id)));
                }
                Err(err) => {
                    warn!(relay = relay.url(), %err, "list failed");
                    last_err = Some(err);
                }
            }
        }
        match (any_ok, last_err) {
            (false, Some(err)) => Err(err),
            _ => {
                merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(merged)
            }
        }
    }

    async fn publish(&self, event: &Event) -> Result<(), RelayError> {
        if self.relays.is_empty() {
            return Err(RelayError::NoRelays);
        }
        let mut pending: FuturesUnordered<_> = self
            .relays
            .iter()
            .map(|r| async move { (r.url().to_string(), r.publish(event).await) })
            .collect();

        let mut reasons = Vec::new();
        while let Some((url, outcome)) = pending.next().await {
            match outcome {
                Ok(()) => {
                    debug!(relay = %url, event = %event.id, kind = %event.kind, "published");
                    return Ok(());
                }
                Err(err) => reasons.push(err.to_string()),
            }
        }
        warn!(event = %event.id, kind = %event.kind, "rejected by every relay");
        Err(RelayError::AllRejected {
            event: event.id.to_hex(),
            reasons,
        })
    }

    async fn subscribe(&self, filters: &[Filter]) -> Result<mpsc::Receiver<Event>, RelayError> {
        if self.relays.is_empty() {
            return Err(RelayError::NoRelays);
        }
        let mut feeds = Vec::new();
        for relay in &self.relays {
            match relay.subscribe(filters).await {
                Ok(feed) => feeds.push(feed),
                Err(err) => warn!(relay = relay.url(), %err, "subscribe failed"),
            }
        }
        if feeds.is_empty() {
            return Err(RelayError::SubscriptionClosed);
        }

        // One forwarding task per relay feed; each ends when its feed closes
        // or the merged receiver is dropped.
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let dedup = Arc::new(std::sync::Mutex::new(EventDedup::default()));
        for mut feed in feeds {
            let tx = tx.clone();
            let dedup = Arc::clone(&dedup);
            tokio::spawn(async move {
                while let Some(event) = feed.recv().await {
                    let duplicate = match dedup.lock() {
                        Ok(mut seen) => seen.is_duplicate(&event.id),
                        Err(_) => false,
                    };
                    if duplicate {
                        continue;
                    }
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
        }
        Ok(rx)
    }
}
