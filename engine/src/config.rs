//! Engine configuration with TOML file support.

use cosign_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Configuration for a [`Session`](crate::Session).
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long an approval stays active, in seconds.
    #[serde(default = "default_approval_ttl_secs")]
    pub approval_ttl_secs: u64,

    /// Check ids and signatures of received events before dispatch.
    #[serde(default = "default_true")]
    pub verify_events: bool,

    /// How far back the live feed reaches when it starts, in seconds.
    #[serde(default)]
    pub feed_lookback_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter (e.g. "info", "debug,cosign_engine=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_approval_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("EngineConfig is always serializable to TOML")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approval_ttl_secs: default_approval_ttl_secs(),
            verify_events: true,
            feed_lookback_secs: 0,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
