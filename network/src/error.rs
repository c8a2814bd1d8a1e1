use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay {relay} rejected the event: {reason}")]
    Rejected { relay: String, reason: String },

    #[error("event {event} was rejected by every relay: {}", reasons.join("; "))]
    AllRejected { event: String, reasons: Vec<String> },

    #[error("no relays configured")]
    NoRelays,

    #[error("relay {relay} unreachable: {reason}")]
    Connection { relay: String, reason: String },

    #[error("subscription closed")]
    SubscriptionClosed,
}
