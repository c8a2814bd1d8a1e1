//! Shared utilities for cosign.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
