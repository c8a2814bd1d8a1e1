//! Relay networking layer for cosign.
//!
//! Defines the [`Relay`] contract the engine talks to, the [`Filter`] query
//! language, and [`RelayPool`], which fans requests out over several relays.
//! Socket transport lives behind the [`Relay`] trait and is not part of this crate.

pub mod dedup;
pub mod error;
pub mod filter;
pub mod pool;
pub mod relay;

pub use error::RelayError;
pub use filter::Filter;
pub use pool::{BroadcastResult, RelayPool};
pub use relay::Relay;
