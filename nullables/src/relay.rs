//! Nullable relay: an in-memory event store that behaves like a relay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cosign_network::filter::any_match;
use cosign_network::{Filter, Relay, RelayError};
use cosign_types::{Event, EventId, Kind, TagKind};
use tokio::sync::mpsc;

type RejectRule = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// A relay that keeps events in memory.
///
/// Published events become visible to later `list` calls and are pushed to
/// live subscriptions. Deletion events remove the referenced events authored
/// by the same key, as real relays do. Rejection rules make `publish` fail
/// for chosen events.
pub struct NullRelay {
    url: String,
    events: Mutex<Vec<Event>>,
    published: Mutex<Vec<Event>>,
    reject: Mutex<Vec<RejectRule>>,
    subscribers: Mutex<Vec<(Vec<Filter>, mpsc::Sender<Event>)>>,
    list_calls: AtomicUsize,
}

impl NullRelay {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            events: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            reject: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Store events as if they had been published earlier.
    pub fn seed(&self, events: impl IntoIterator<Item = Event>) {
        self.events.lock().unwrap().extend(events);
    }

    /// Reject every future publish for which `rule` returns true.
    pub fn reject_when(&self, rule: impl Fn(&Event) -> bool + Send + Sync + 'static) {
        self.reject.lock().unwrap().push(Box::new(rule));
    }

    /// Reject every future publish.
    pub fn reject_all(&self) {
        self.reject_when(|_| true);
    }

    pub fn accept_all(&self) {
        self.reject.lock().unwrap().clear();
    }

    /// Every event this relay acknowledged, in publish order.
    pub fn published(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_of(&self, kind: Kind) -> Vec<Event> {
        self.published()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    /// Every event currently stored.
    pub fn stored(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.id == *id)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn apply_deletion(events: &mut Vec<Event>, deletion: &Event) {
        let targets: Vec<EventId> = deletion
            .tag_values(TagKind::Event)
            .filter_map(|v| EventId::from_hex(v).ok())
            .collect();
        events.retain(|e| !(targets.contains(&e.id) && e.pubkey == deletion.pubkey));
    }
}

impl Default for NullRelay {
    fn default() -> Self {
        Self::new("null://relay")
    }
}

#[async_trait]
impl Relay for NullRelay {
    fn url(&self) -> &str {
        &self.url
    }

    async fn list(&self, filters: &[Filter]) -> Result<Vec<Event>, RelayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let events = self.events.lock().unwrap();
        let mut found: Vec<Event> = Vec::new();
        for filter in filters {
            let mut matching: Vec<&Event> = events.iter().filter(|e| filter.matches(e)).collect();
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            if let Some(limit) = filter.limit {
                matching.truncate(limit);
            }
            for event in matching {
                if !found.iter().any(|f| f.id == event.id) {
                    found.push(event.clone());
                }
            }
        }
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn publish(&self, event: &Event) -> Result<(), RelayError> {
        if self.reject.lock().unwrap().iter().any(|rule| rule(event)) {
            return Err(RelayError::Rejected {
                relay: self.url.clone(),
                reason: "blocked".into(),
            });
        }
        {
            let mut events = self.events.lock().unwrap();
            if event.kind == Kind::EVENT_DELETION {
                Self::apply_deletion(&mut events, event);
            }
            if !events.iter().any(|e| e.id == event.id) {
                events.push(event.clone());
            }
        }
        self.published.lock().unwrap().push(event.clone());

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|(filters, tx)| {
            if !any_match(filters, event) {
                return !tx.is_closed();
            }
            tx.try_send(event.clone()).is_ok()
        });
        Ok(())
    }

    async fn subscribe(&self, filters: &[Filter]) -> Result<mpsc::Receiver<Event>, RelayError> {
        let (tx, rx) = mpsc::channel(cosign_network::relay::FEED_CAPACITY);
        self.subscribers
            .lock()
            .unwrap()
            .push((filters.to_vec(), tx));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_crypto::{Authenticator, EventBuilder, KeyAuthenticator};
    use cosign_types::{Tag, Timestamp};

    #[tokio::test]
    async fn published_events_are_listed_newest_first() {
        let relay = NullRelay::default();
        let auth = KeyAuthenticator::generate();
        for at in [10, 30, 20] {
            let event = EventBuilder::new(Kind::POLICY, "x")
                .created_at(Timestamp::new(at))
                .sign(&auth);
            relay.publish(&event).await.unwrap();
        }
        let listed = relay.list(&[Filter::new().kind(Kind::POLICY)]).await.unwrap();
        let stamps: Vec<u64> = listed.iter().map(|e| e.created_at.as_secs()).collect();
        assert_eq!(stamps, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn rejection_rules_fail_publish() {
        let relay = NullRelay::default();
        relay.reject_when(|e| e.kind == Kind::PROPOSAL);
        let auth = KeyAuthenticator::generate();
        let event = EventBuilder::new(Kind::PROPOSAL, "x").sign(&auth);
        assert!(relay.publish(&event).await.is_err());
        assert!(relay.published().is_empty());
    }

    #[tokio::test]
    async fn deletion_removes_only_own_events() {
        let relay = NullRelay::default();
        let alice = KeyAuthenticator::generate();
        let bob = KeyAuthenticator::generate();
        let mine = EventBuilder::new(Kind::PROPOSAL, "a").sign(&alice);
        let theirs = EventBuilder::new(Kind::PROPOSAL, "b").sign(&bob);
        relay.seed([mine.clone(), theirs.clone()]);

        let deletion = EventBuilder::new(Kind::EVENT_DELETION, "")
            .tag(Tag::event(&mine.id))
            .tag(Tag::event(&theirs.id))
            .sign(&alice);
        relay.publish(&deletion).await.unwrap();

        assert!(!relay.contains(&mine.id));
        assert!(relay.contains(&theirs.id));
    }

    #[tokio::test]
    async fn subscribers_receive_matching_events() {
        let relay = NullRelay::default();
        let auth = KeyAuthenticator::generate();
        let mut feed = relay
            .subscribe(&[Filter::new().pubkey(auth.public_key())])
            .await
            .unwrap();

        let unrelated = EventBuilder::new(Kind::POLICY, "x").sign(&auth);
        relay.publish(&unrelated).await.unwrap();
        let tagged = EventBuilder::new(Kind::POLICY, "y")
            .tag(Tag::pubkey(&auth.public_key()))
            .sign(&auth);
        relay.publish(&tagged).await.unwrap();

        assert_eq!(feed.recv().await.unwrap().id, tagged.id);
    }
}
