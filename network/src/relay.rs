//! The relay contract: list, publish and subscribe over protocol events.

use async_trait::async_trait;
use cosign_types::Event;
use tokio::sync::mpsc;

use crate::error::RelayError;
use crate::filter::Filter;

/// Bound on buffered subscription events per feed.
pub const FEED_CAPACITY: usize = 1024;

/// One relay endpoint (or a pool of them acting as one).
#[async_trait]
pub trait Relay: Send + Sync {
    /// Endpoint identifier used in logs and errors.
    fn url(&self) -> &str;

    /// Stored events matching any of `filters`.
    async fn list(&self, filters: &[Filter]) -> Result<Vec<Event>, RelayError>;

    /// Submit `event`. `Ok` means the relay acknowledged it.
    async fn publish(&self, event: &Event) -> Result<(), RelayError>;

    /// Live feed of future events matching any of `filters`.
    async fn subscribe(&self, filters: &[Filter]) -> Result<mpsc::Receiver<Event>, RelayError>;
}
