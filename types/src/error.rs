//! Error type for parsing and decoding protocol values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("event {event} is missing a `{tag}` tag")]
    MissingTag { event: String, tag: &'static str },

    #[error("malformed `{tag}` tag value: {value}")]
    MalformedTag { tag: &'static str, value: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
