//! Logging bootstrap for applications embedding the engine
//!
//! The engine itself only emits `tracing` events; installing a subscriber
//! is left to the host application, which can use [`init_logging`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;
use crate::error::{Result, RuleError};

/// Install a global subscriber for the given configuration
///
/// `RUST_LOG`, when set and valid, overrides `config.level`. Fails with
/// [`RuleError::Configuration`] if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    let layer = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .try_init()
        .map_err(|e| RuleError::Configuration(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| RuleError::Configuration(format!("Invalid log level '{}': {}", config.level, e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_directives() {
        let config = LogConfig {
            level: "rule_engine=debug,warn".to_string(),
            json: false,
        };
        assert!(build_filter(&config).is_ok());
    }
}
