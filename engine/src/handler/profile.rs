use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::Authenticator;
use cosign_network::RelayPool;
use cosign_types::{Contact, Event, EventId, Kind, Metadata, Profile, PublicKey};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{delete_own, EventKindHandler};
use crate::entity::DomainEntity;
use crate::stores::StoreSet;
use crate::EngineError;

/// Public profile metadata. Replaceable: only the newest event per author
/// counts.
pub struct MetadataHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    stores: Arc<StoreSet>,
    lock: Mutex<()>,
}

impl MetadataHandler {
    pub fn new(authenticator: Arc<dyn Authenticator>, relay: RelayPool, stores: Arc<StoreSet>) -> Self {
        Self {
            authenticator,
            relay,
            stores,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventKindHandler for MetadataHandler {
    fn kind(&self) -> Kind {
        Kind::METADATA
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let mut seen = HashSet::new();
        let mut authors: Vec<PublicKey> = Vec::new();
        for event in events {
            if !seen.insert(event.id) {
                continue;
            }
            self.stores.cached_raw(&event)?;
            if !authors.contains(&event.pubkey) {
                authors.push(event.pubkey);
            }
            let current = self.stores.profiles.get(&event.pubkey)?;
            if current.is_some_and(|p| p.created_at >= Some(event.created_at)) {
                continue;
            }
            let metadata: Metadata = match serde_json::from_str(&event.content) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(event = %event.id, error = %err, "unparsable profile metadata");
                    continue;
                }
            };
            self.stores.profiles.store([Profile {
                public_key: event.pubkey,
                metadata,
                created_at: Some(event.created_at),
            }])?;
            self.stores.raw.store([event])?;
        }

        let mut out = Vec::with_capacity(authors.len());
        for author in authors {
            if let Some(profile) = self.stores.profiles.get(&author)? {
                out.push(profile.into());
            }
        }
        Ok(out)
    }

    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    /// A profile goes only when the deleted event is the one it was built from.
    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            let Some(raw) = self.stores.raw.get(&id)? else {
                continue;
            };
            let current = self.stores.profiles.get(&raw.pubkey)?;
            if current.is_some_and(|p| p.created_at == Some(raw.created_at)) {
                self.stores.profiles.delete_keys(&[raw.pubkey])?;
            }
            self.stores.forget_raw(&[id])?;
            removed.push(id);
        }
        Ok(removed)
    }
}

/// Contact lists. Replaceable like metadata, but not cached beyond the raw
/// event: callers always want the newest list from the network.
pub struct ContactsHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    stores: Arc<StoreSet>,
    lock: Mutex<()>,
}

impl ContactsHandler {
    pub fn new(authenticator: Arc<dyn Authenticator>, relay: RelayPool, stores: Arc<StoreSet>) -> Self {
        Self {
            authenticator,
            relay,
            stores,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventKindHandler for ContactsHandler {
    fn kind(&self) -> Kind {
        Kind::CONTACTS
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let mut newest: HashMap<PublicKey, Event> = HashMap::new();
        for event in events {
            self.stores.cached_raw(&event)?;
            match newest.get(&event.pubkey) {
                Some(current) if current.created_at >= event.created_at => {}
                _ => {
                    newest.insert(event.pubkey, event);
                }
            }
        }

        let mut out = Vec::with_capacity(newest.len());
        for event in newest.into_values() {
            let contacts: Vec<Contact> = event.tags.iter().filter_map(Contact::from_tag).collect();
            debug!(author = %event.pubkey, count = contacts.len(), "contact list");
            self.stores.raw.store([event])?;
            out.push(DomainEntity::Contacts(contacts));
        }
        Ok(out)
    }

    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.stores.raw.delete_keys(&[id])? > 0 {
                removed.push(id);
            }
        }
        Ok(removed)
    }
}
