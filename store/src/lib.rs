//! In-memory entity stores for cosign.
//!
//! Every decrypted record the engine produces is cached in an [`EntityStore`]
//! keyed by its primary id, with optional secondary indexes (proposals by
//! policy, approvals by proposal). Stores are rebuilt from the network each
//! session; nothing is persisted.

pub mod entities;
pub mod entity;
pub mod error;
pub mod memory;

pub use entity::Entity;
pub use error::StoreError;
pub use memory::EntityStore;
