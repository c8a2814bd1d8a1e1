use std::sync::Arc;

use async_trait::async_trait;
use cosign_crypto::{Authenticator, AuthenticatorExt};
use cosign_network::RelayPool;
use cosign_types::{
    Event, EventId, Kind, OwnedSigner, OwnedSignerContent, SharedSigner, SharedSignerContent,
};
use tokio::sync::Mutex;
use tracing::debug;

use super::{delete_own, split_cached, EventKindHandler};
use crate::entity::DomainEntity;
use crate::stores::StoreSet;
use crate::EngineError;

/// Signers the caller registered for themselves, encrypted to their own key.
pub struct OwnedSignerHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    stores: Arc<StoreSet>,
    lock: Mutex<()>,
}

impl OwnedSignerHandler {
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
impl EventKindHandler for OwnedSignerHandler {
    fn kind(&self) -> Kind {
        Kind::SIGNERS
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let me = self.authenticator.public_key();
        let (cached, fresh) = split_cached(&self.stores, events, |e| {
            Ok(self.stores.owned_signers.get(&e.id)?)
        })?;
        let mut out: Vec<DomainEntity> = cached.into_iter().map(DomainEntity::from).collect();

        let mut signers = Vec::new();
        let mut raws = Vec::new();
        for event in fresh {
            if event.pubkey != me {
                debug!(signer = %event.id, "signer owned by someone else");
                continue;
            }
            let content: OwnedSignerContent = self.authenticator.decrypt_obj(&event.content)?;
            let signer = OwnedSigner {
                id: event.id,
                owner: event.pubkey,
                created_at: event.created_at,
                signer: content,
            };
            signers.push(signer.clone());
            raws.push(event);
            out.push(signer.into());
        }
        self.stores.owned_signers.store(signers)?;
        self.stores.raw.store(raws)?;
        Ok(out)
    }

    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.stores.owned_signers.delete_keys(&[id])? > 0 {
                removed.push(id);
            }
        }
        self.stores.forget_raw(&removed)?;
        Ok(removed)
    }
}

/// Signers shared between two users. The owner encrypts the signer to the
/// recipient named in the `p` tag; both sides can read it.
pub struct SharedSignerHandler {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    stores: Arc<StoreSet>,
    lock: Mutex<()>,
}

impl SharedSignerHandler {
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
impl EventKindHandler for SharedSignerHandler {
    fn kind(&self) -> Kind {
        Kind::SHARED_SIGNERS
    }

    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn handle(&self, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let me = self.authenticator.public_key();
        let (cached, fresh) = split_cached(&self.stores, events, |e| {
            Ok(self.stores.shared_signers.get(&e.id)?)
        })?;
        let mut out: Vec<DomainEntity> = cached.into_iter().map(DomainEntity::from).collect();

        let mut signers = Vec::new();
        let mut raws = Vec::new();
        for event in fresh {
            let Some(recipient) = event.pubkey_refs()?.first().copied() else {
                debug!(signer = %event.id, "shared signer without recipient");
                continue;
            };
            let counterparty = if event.pubkey == me {
                recipient
            } else if recipient == me {
                event.pubkey
            } else {
                debug!(signer = %event.id, "shared signer between other users");
                continue;
            };
            let content: SharedSignerContent = self
                .authenticator
                .decrypt_obj_from(&event.content, &counterparty)?;
            let signer = SharedSigner {
                id: event.id,
                owner: event.pubkey,
                shared_with: recipient,
                created_at: event.created_at,
                signer: content,
            };
            signers.push(signer.clone());
            raws.push(event);
            out.push(signer.into());
        }
        self.stores.shared_signers.store(signers)?;
        self.stores.raw.store(raws)?;
        Ok(out)
    }

    /// Only the owner can withdraw a shared signer.
    async fn remove(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        delete_own(self, self.authenticator.as_ref(), &self.relay, &self.stores, ids).await
    }

    async fn forget(&self, ids: Vec<EventId>) -> Result<Vec<EventId>, EngineError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.stores.shared_signers.delete_keys(&[id])? > 0 {
                removed.push(id);
            }
        }
        self.stores.forget_raw(&removed)?;
        Ok(removed)
    }
}
