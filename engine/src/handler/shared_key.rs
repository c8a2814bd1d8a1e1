use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::Authenticator;
use cosign_network::RelayPool;
use cosign_store::entities::EVENT_ID;
use cosign_types::{Event, EventId, Kind};
use tokio::sync::Mutex;

use super::{delete_own, split_cached, EventKindHandler};
use crate::entity::DomainEntity;
use crate::resolver::SharedKeyResolver;
use crate::stores::StoreSet;
use crate::EngineError;

/// Grants of a policy's shared key. Decoding is the resolver's job; this
/// handler feeds it grants that arrive outside a resolution round.
pub struct SharedKeyHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    resolver: Arc<SharedKeyResolver>,
    stores: Arc<StoreSet>,
    lock: Mutex<()>,
}

impl SharedKeyHandler {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        relay: RelayPool,
        resolver: Arc<SharedKeyResolver>,
        stores: Arc<StoreSet>,
    ) -> Self {
        Self {
            authenticator,
            relay,
            resolver,
            stores,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventKindHandler for SharedKeyHandler {
    fn kind(&self) -> Kind {
        Kind::SHARED_KEY
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let (cached, fresh) = split_cached(&self.stores, events, |e| {
            Ok(self.stores.shared_keys.get_by(EVENT_ID, &e.id.to_hex())?)
        })?;
        let mut out: Vec<DomainEntity> = cached.into_iter().map(DomainEntity::from).collect();
        out.extend(
            self.resolver
                .ingest_grants(fresh)?
                .into_iter()
                .map(DomainEntity::from),
        );
        Ok(out)
    }

    /// Withdraws grants the caller issued.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        Ok(self
            .resolver
            .forget_grants(&ids)?
            .into_iter()
            .map(|key| key.id)
            .collect())
    }
}
