//! Logging setup driven by [`EngineConfig`].

use crate::config::EngineConfig;
use crate::EngineError;

pub use cosign_utils::{init_logging, LogFormat};

/// Install the global subscriber using the config's format and level.
pub fn init_from_config(config: &EngineConfig) -> Result<(), EngineError> {
    init_logging(config.log_format, &config.log_level)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_utils::LoggingError;

    #[test]
    fn config_driven_init_installs_once() {
        let config = EngineConfig {
            log_format: LogFormat::Json,
            log_level: "warn,cosign_engine=debug".into(),
            ..EngineConfig::default()
        };
        let _ = init_from_config(&config);
        assert!(matches!(
            init_from_config(&config),
            Err(EngineError::Logging(LoggingError::AlreadyInitialised))
        ));
    }
}
