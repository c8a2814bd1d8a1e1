use cosign_types::{EventId, Kind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("crypto error: {0}")]
    Crypto(#[from] cosign_crypto::CryptoError),

    #[error("store error: {0}")]
    Store(#[from] cosign_store::StoreError),

    #[error("relay error: {0}")]
    Relay(#[from] cosign_network::RelayError),

    #[error("bitcoin error: {0}")]
    Bitcoin(#[from] cosign_types::BitcoinError),

    #[error("malformed event: {0}")]
    Type(#[from] cosign_types::TypeError),

    #[error("logging error: {0}")]
    Logging(#[from] cosign_utils::LoggingError),

    #[error("no handler for event kind {0}")]
    UnknownKind(Kind),

    /// An event id was seen again with different content than the cached copy.
    #[error("event {event} does not match its cached copy")]
    IntegrityMismatch { event: EventId },

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("no shared key for policy {0}: not a participant")]
    NotParticipant(EventId),

    /// Some deletion events were rejected; their entities are still cached.
    #[error("deletion of {} entities failed: {}", failed.len(), reasons.join("; "))]
    DeleteIncomplete {
        failed: Vec<EventId>,
        reasons: Vec<String>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("session has been dropped")]
    SessionClosed,
}

impl EngineError {
    pub(crate) fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }
}
