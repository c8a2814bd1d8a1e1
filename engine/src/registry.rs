//! Lazily built, memoized handlers, one per event kind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use cosign_crypto::Authenticator;
use cosign_network::RelayPool;
use cosign_types::{BitcoinUtil, Clock, Kind};
use tracing::debug;

use crate::handler::{
    ApprovalHandler, CompletedHandler, ContactsHandler, DeletionHandler, EventKindHandler,
    LabelHandler, MetadataHandler, OwnedSignerHandler, PolicyHandler, ProposalHandler,
    SharedKeyHandler, SharedSignerHandler,
};
use crate::queries::SessionQueries;
use crate::resolver::SharedKeyResolver;
use crate::stores::StoreSet;
use crate::EngineError;

/// Everything a handler may be wired with. Each handler takes only the
/// parts it needs.
#[derive(Clone)]
pub struct HandlerDeps {
    pub authenticator: Arc<dyn Authenticator>,
    pub relay: RelayPool,
    pub bitcoin: Arc<dyn BitcoinUtil>,
    pub clock: Arc<dyn Clock>,
    pub stores: Arc<StoreSet>,
    pub resolver: Arc<SharedKeyResolver>,
    pub queries: Arc<dyn SessionQueries>,
    pub approval_ttl_secs: u64,
}

pub struct HandlerRegistry {
    deps: HandlerDeps,
    handlers: Mutex<HashMap<Kind, Arc<dyn EventKindHandler>>>,
}

impl HandlerRegistry {
    pub fn new(deps: HandlerDeps) -> Self {
        Self {
            deps,
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// The handler for `kind`, built on first request and reused after.
    pub fn get_handler(&self, kind: Kind) -> Result<Arc<dyn EventKindHandler>, EngineError> {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handler) = handlers.get(&kind) {
            return Ok(Arc::clone(handler));
        }
        let handler = self.build(kind)?;
        debug!(%kind, "built event handler");
        handlers.insert(kind, Arc::clone(&handler));
        Ok(handler)
    }

    fn build(&self, kind: Kind) -> Result<Arc<dyn EventKindHandler>, EngineError> {
        let d = &self.deps;
        let handler: Arc<dyn EventKindHandler> = match kind {
            Kind::POLICY => Arc::new(PolicyHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.bitcoin.clone(),
                d.stores.clone(),
                d.queries.clone(),
            )),
            Kind::PROPOSAL => Arc::new(ProposalHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.bitcoin.clone(),
                d.stores.clone(),
                d.queries.clone(),
            )),
            Kind::APPROVED_PROPOSAL => Arc::new(ApprovalHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.clock.clone(),
                d.stores.clone(),
                d.queries.clone(),
                d.approval_ttl_secs,
            )),
            Kind::COMPLETED_PROPOSAL => Arc::new(CompletedHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.bitcoin.clone(),
                d.stores.clone(),
                d.queries.clone(),
            )),
            Kind::SHARED_KEY => Arc::new(SharedKeyHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.resolver.clone(),
                d.stores.clone(),
            )),
            Kind::SIGNERS => Arc::new(OwnedSignerHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.stores.clone(),
            )),
            Kind::SHARED_SIGNERS => Arc::new(SharedSignerHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.stores.clone(),
            )),
            Kind::METADATA => Arc::new(MetadataHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.stores.clone(),
            )),
            Kind::CONTACTS => Arc::new(ContactsHandler::new(
                d.authenticator.clone(),
                d.relay.clone(),
                d.stores.clone(),
            )),
            Kind::LABELS => Arc::new(LabelHandler::new(
                d.relay.clone(),
                d.stores.clone(),
                d.queries.clone(),
            )),
            Kind::EVENT_DELETION => {
                Arc::new(DeletionHandler::new(d.stores.clone(), d.queries.clone()))
            }
            other => return Err(EngineError::UnknownKind(other)),
        };
        Ok(handler)
    }
}
