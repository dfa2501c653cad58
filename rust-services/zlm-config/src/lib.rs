//! Configuration management for the ZHA lock manager
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file (`ZLM_CONFIG`, default `zlm.toml`), then `ZLM_`-prefixed environment
//! variables using `__` for nesting (`ZLM_MESSAGE_BUS__URL`). A `.env` file is
//! honoured when present.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use zlm_types::LockDescriptor;

/// Default configuration file looked up when `ZLM_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "zlm.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Message bus configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageBusConfig {
    pub url: String,
    pub subject_prefix: String,
    /// Upper bound for a lock command round trip
    pub command_timeout_secs: u64,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            subject_prefix: "zlm".to_string(),
            command_timeout_secs: 10,
        }
    }
}

impl MessageBusConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the key and lock records
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./.zlm".to_string(),
        }
    }
}

/// Alarm panel integration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub enabled: bool,
    pub entity_id: Option<String>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            entity_id: Some("alarm_control_panel.alarmo".to_string()),
        }
    }
}

impl AlarmConfig {
    /// Disarm target, if the integration is switched on and has one
    pub fn active_target(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.entity_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// HTTP command API
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
    /// Bearer token required on every `/api` request
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8127".to_string(),
            token: None,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind", &self.bind)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub message_bus: MessageBusConfig,
    pub storage: StorageConfig,
    pub alarm: AlarmConfig,
    pub api: ApiConfig,
    /// Operator's lock selection
    pub locks: Vec<LockDescriptor>,
    pub log_level: Option<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            message_bus: MessageBusConfig::default(),
            storage: StorageConfig::default(),
            alarm: AlarmConfig::default(),
            api: ApiConfig::default(),
            locks: Vec::new(),
            log_level: Some("info".to_string()),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the configuration file and the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let path = env::var("ZLM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load configuration from a specific file, still honouring the environment
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("ZLM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_bus.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "message_bus.command_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for descriptor in &self.locks {
            if let Some(ieee) = descriptor.hardware_identity() {
                if !seen.insert(ieee) {
                    return Err(ConfigError::Invalid(format!(
                        "lock {} is selected more than once",
                        ieee
                    )));
                }
            }
        }

        Ok(())
    }

    /// Get message bus URL
    pub fn message_bus_url(&self) -> &str {
        &self.message_bus.url
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
