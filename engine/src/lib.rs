//! Coordination engine for multi-party Bitcoin spending policies.
//!
//! Participants share policies, proposals, approvals and signers as encrypted
//! events on a relay network. A [`Session`] fetches those events, routes each
//! kind to its [`EventKindHandler`], and keeps the decrypted results in
//! per-session caches:
//!
//! - **Shared keys** unlock everything scoped to a policy; the
//!   [`SharedKeyResolver`] finds them from the caller's grants.
//! - **Handlers** are built on demand by the [`HandlerRegistry`] and reach
//!   each other only through [`SessionQueries`].
//! - **Sync** feeds mixed batches through the handlers in dependency order.
//! - **Deletes** cascade from a policy to everything under it and only drop
//!   local state for deletions a relay accepted.

pub mod config;
pub mod entity;
pub mod error;
pub mod handler;
pub mod logging;
pub mod queries;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod stores;
pub mod sync;

pub use config::EngineConfig;
pub use entity::{collect, Deleted, DomainEntity, FromEntity, SharedKey};
pub use error::EngineError;
pub use handler::EventKindHandler;
pub use queries::SessionQueries;
pub use registry::{HandlerDeps, HandlerRegistry};
pub use resolver::SharedKeyResolver;
pub use session::{SavedPolicy, Session, SessionBuilder};
pub use stores::StoreSet;
pub use sync::{SyncFailure, SyncReport};
