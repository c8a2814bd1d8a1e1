//! Shared-key resolution.
//!
//! Every policy-scoped event is encrypted and signed with the policy's shared
//! key. Participants receive that key through grant events: the key's secret,
//! encrypted by the policy creator to each participant. The resolver answers
//! "which shared keys do I hold for these policies" from the cache, asking
//! the network once for whatever is missing.

use std::collections::HashMap;
use std::sync::Arc;

use cosign_crypto::{Authenticator, KeyAuthenticator};
use cosign_network::{Filter, Relay, RelayPool};
use cosign_store::entities::EVENT_ID;
use cosign_types::{Event, EventId, Kind};
use tracing::{debug, warn};

use crate::entity::SharedKey;
use crate::stores::StoreSet;
use crate::EngineError;

pub struct SharedKeyResolver {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    stores: Arc<StoreSet>,
}

impl SharedKeyResolver {
    pub fn new(authenticator: Arc<dyn Authenticator>, relay: RelayPool, stores: Arc<StoreSet>) -> Self {
        Self {
            authenticator,
            relay,
            stores,
        }
    }

    /// Shared keys for `policy_ids`. Policies the caller holds no grant for
    /// are absent from the result: the caller is not a participant.
    pub async fn resolve(
        &self,
        policy_ids: &[EventId],
    ) -> Result<HashMap<EventId, SharedKey>, EngineError> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        for id in policy_ids {
            if found.contains_key(id) || missing.contains(id) {
                continue;
            }
            match self.stores.shared_keys.get(id)? {
                Some(key) => {
                    found.insert(*id, key);
                }
                None => missing.push(*id),
            }
        }
        if missing.is_empty() {
            return Ok(found);
        }

        let filter = Filter::new()
            .kind(Kind::SHARED_KEY)
            .events(missing.iter().copied())
            .pubkey(self.authenticator.public_key());
        let grants = self.relay.list(&[filter]).await?;
        debug!(
            requested = missing.len(),
            grants = grants.len(),
            "fetched shared key grants"
        );

        for key in self.ingest_grants(grants)? {
            if missing.contains(&key.policy_id) {
                found.insert(key.policy_id, key);
            }
        }
        Ok(found)
    }

    /// Decrypt and cache grant events addressed to the caller.
    ///
    /// Grants that are not for the caller are skipped. A grant addressed to
    /// the caller that does not decrypt fails the whole batch. When a policy
    /// already has a live key the cached record wins.
    pub fn ingest_grants(&self, grants: Vec<Event>) -> Result<Vec<SharedKey>, EngineError> {
        let me = self.authenticator.public_key();
        let mut keys = Vec::with_capacity(grants.len());
        for grant in grants {
            if !grant.pubkey_refs()?.contains(&me) {
                debug!(grant = %grant.id, "grant addressed to someone else");
                continue;
            }
            let policy_id = match grant.first_event_ref() {
                Ok(id) => id,
                Err(err) => {
                    warn!(grant = %grant.id, error = %err, "grant without policy reference");
                    continue;
                }
            };
            if let Some(existing) = self.stores.shared_keys.get(&policy_id)? {
                keys.push(existing);
                continue;
            }
            let authenticator = self.decrypt_grant(&grant)?;
            let key = SharedKey {
                id: grant.id,
                policy_id,
                creator: grant.pubkey,
                created_at: grant.created_at,
                authenticator: Arc::new(authenticator),
            };
            self.stores.shared_keys.store([key.clone()])?;
            self.stores.raw.store([grant])?;
            keys.push(key);
        }
        Ok(keys)
    }

    fn decrypt_grant(&self, grant: &Event) -> Result<KeyAuthenticator, EngineError> {
        let secret = self.authenticator.decrypt(&grant.content, &grant.pubkey)?;
        Ok(KeyAuthenticator::from_secret_hex(secret.trim())?)
    }

    /// Remove cached keys whose grant event is among `grant_ids`.
    pub fn forget_grants(&self, grant_ids: &[EventId]) -> Result<Vec<SharedKey>, EngineError> {
        let mut removed = Vec::new();
        for id in grant_ids {
            if let Some(key) = self.stores.shared_keys.get_by(EVENT_ID, &id.to_hex())? {
                removed.push(key);
            }
        }
        self.stores.shared_keys.delete(removed.iter())?;
        self.stores.forget_raw(grant_ids)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_crypto::EventBuilder;
    use cosign_network::Relay;
    use cosign_nullables::NullRelay;
    use cosign_types::Tag;

    fn grant(from: &KeyAuthenticator, to: &KeyAuthenticator, policy: EventId, shared: &KeyAuthenticator) -> Event {
        let content = from.encrypt(&shared.secret_hex(), &to.public_key()).unwrap();
        EventBuilder::new(Kind::SHARED_KEY, content)
            .tag(Tag::event(&policy))
            .tag(Tag::pubkey(&to.public_key()))
            .sign(from)
    }

    fn resolver_for(me: KeyAuthenticator, relay: Arc<NullRelay>) -> SharedKeyResolver {
        let pool = RelayPool::new(vec![relay as Arc<dyn Relay>]);
        SharedKeyResolver::new(Arc::new(me), pool, Arc::new(StoreSet::new()))
    }

    #[tokio::test]
    async fn resolves_granted_keys_and_caches_them() {
        let creator = KeyAuthenticator::generate();
        let me = KeyAuthenticator::generate();
        let shared = KeyAuthenticator::generate();
        let policy = EventId([7; 32]);
        let relay = Arc::new(NullRelay::default());
        relay.seed([grant(&creator, &me, policy, &shared)]);

        let resolver = resolver_for(me, relay.clone());
        let keys = resolver.resolve(&[policy]).await.unwrap();
        assert_eq!(keys[&policy].public_key(), shared.public_key());
        assert_eq!(keys[&policy].creator, creator.public_key());

        resolver.resolve(&[policy, policy]).await.unwrap();
        assert_eq!(relay.list_calls(), 1);
    }

    #[tokio::test]
    async fn non_participants_get_no_key() {
        let creator = KeyAuthenticator::generate();
        let someone = KeyAuthenticator::generate();
        let me = KeyAuthenticator::generate();
        let shared = KeyAuthenticator::generate();
        let policy = EventId([9; 32]);
        let relay = Arc::new(NullRelay::default());
        relay.seed([grant(&creator, &someone, policy, &shared)]);

        let resolver = resolver_for(me, relay);
        assert!(resolver.resolve(&[policy]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forgetting_a_grant_drops_its_key() {
        let creator = KeyAuthenticator::generate();
        let me = KeyAuthenticator::generate();
        let shared = KeyAuthenticator::generate();
        let policy = EventId([3; 32]);
        let event = grant(&creator, &me, policy, &shared);
        let resolver = resolver_for(me, Arc::new(NullRelay::default()));

        assert_eq!(resolver.ingest_grants(vec![event.clone()]).unwrap().len(), 1);
        let removed = resolver.forget_grants(&[event.id]).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(resolver.stores.shared_keys.is_empty().unwrap());
        assert!(!resolver.stores.raw.contains(&event.id).unwrap());
    }

    #[tokio::test]
    async fn grant_for_me_that_does_not_decrypt_is_an_error() {
        let creator = KeyAuthenticator::generate();
        let me = KeyAuthenticator::generate();
        let other = KeyAuthenticator::generate();
        let shared = KeyAuthenticator::generate();
        let policy = EventId([5; 32]);
        let content = creator.encrypt(&shared.secret_hex(), &other.public_key()).unwrap();
        let event = EventBuilder::new(Kind::SHARED_KEY, content)
            .tag(Tag::event(&policy))
            .tag(Tag::pubkey(&me.public_key()))
            .sign(&creator);
        let resolver = resolver_for(me, Arc::new(NullRelay::default()));

        assert!(resolver.ingest_grants(vec![event.clone()]).is_err());
        assert!(resolver.stores.shared_keys.is_empty().unwrap());
        assert!(!resolver.stores.raw.contains(&event.id).unwrap());
    }
}
