//! Engine configuration
//!
//! Sources, lowest to highest priority:
//! 1. Default values
//! 2. `config/rule-engine.toml`, `.yaml`, `.json` (or one explicit file)
//! 3. Environment variables prefixed `RULE_ENGINE_`, nested keys joined
//!    with `__` (e.g. `RULE_ENGINE_LOG__LEVEL=debug`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};

/// Environment variable prefix read by [`load_config`]
pub const DEFAULT_ENV_PREFIX: &str = "RULE_ENGINE_";

/// Default config file stem, looked up under `config/`
pub const DEFAULT_CONFIG_NAME: &str = "rule-engine";

/// Which engine [`crate::RuleEngineBuilder::build`] produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Single ordered pass
    #[default]
    Default,
    /// Repeat passes until no rule applies
    Inference,
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: EngineMode,
    /// Stop a pass after the first condition or action failure
    pub skip_after_failed: bool,
    /// Stop a pass after the first rule whose condition did not hold
    pub skip_after_declined: bool,
    /// Stop a pass before the first rule with a greater priority
    pub priority_threshold: Option<i32>,
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error, or `target=level` list)
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration from `config/rule-engine.*` and `RULE_ENGINE_*`
pub fn load_config() -> Result<EngineConfig> {
    let dir = Path::new("config");
    let figment = Figment::new()
        .merge(Toml::file(dir.join(format!("{}.toml", DEFAULT_CONFIG_NAME))))
        .merge(Yaml::file(dir.join(format!("{}.yaml", DEFAULT_CONFIG_NAME))))
        .merge(Json::file(dir.join(format!("{}.json", DEFAULT_CONFIG_NAME))))
        .merge(Env::prefixed(DEFAULT_ENV_PREFIX).split("__"));

    figment
        .extract()
        .map_err(|e| RuleError::Configuration(format!("Failed to load configuration: {}", e)))
}

/// Load configuration from one file, then apply `RULE_ENGINE_*` overrides
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    load_config_with_prefix(path, DEFAULT_ENV_PREFIX)
}

/// Load configuration from one file, then apply overrides under `env_prefix`
///
/// The format follows the file extension (`toml`, `yaml`/`yml`, `json`).
pub fn load_config_with_prefix<P: AsRef<Path>>(path: P, env_prefix: &str) -> Result<EngineConfig> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(RuleError::Configuration(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| RuleError::Configuration("Config file must have an extension".to_string()))?;

    let figment = match extension {
        "toml" => Figment::new().merge(Toml::file(path)),
        "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
        "json" => Figment::new().merge(Json::file(path)),
        _ => {
            return Err(RuleError::Configuration(format!(
                "Unsupported config file format: {}",
                extension
            )))
        },
    };

    figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()
        .map_err(|e| {
            RuleError::Configuration(format!(
                "Failed to load configuration from {}: {}",
                path.display(),
                e
            ))
        })
}
