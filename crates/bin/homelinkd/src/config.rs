//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `homelink.toml` in the working directory. Every section has a
//! sensible default so the file is optional, except `[[devices]]` entries
//! and the notifier block, which cannot be invented. Environment variables
//! take precedence over file values.

use serde::Deserialize;

use homelink_adapter_devices::{ClimateArgs, CurtainArgs, DimmerArgs};
use homelink_adapter_mqtt::MqttConfig;
use homelink_adapter_notify::NotifierConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hardware bus settings.
    pub mqtt: MqttConfig,
    /// Assistant callback settings; change pushes are disabled when absent.
    pub notifier: Option<NotifierConfig>,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device wiring entries, mapped to concrete drivers by `kind`.
    pub devices: Vec<DeviceEntry>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homelinkd=info,homelink=info".to_string(),
        }
    }
}

/// One `[[devices]]` entry: a driver kind plus its wiring arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEntry {
    Dimmer(DimmerArgs),
    Curtain(CurtainArgs),
    Climate(ClimateArgs),
}

impl Config {
    /// Load configuration from `homelink.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("homelink.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMELINK_MQTT_HOST") {
            self.mqtt.host = val;
        }
        if let Ok(val) = std::env::var("HOMELINK_MQTT_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.port = port;
        }
        if let Ok(val) = std::env::var("HOMELINK_TOKEN")
            && let Some(notifier) = &mut self.notifier
        {
            notifier.token = val;
        }
        if let Ok(val) = std::env::var("HOMELINK_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.port == 0 {
            return Err(ConfigError::Validation(
                "mqtt port must be non-zero".to_string(),
            ));
        }
        if let Some(notifier) = &self.notifier {
            if notifier.skill_id.is_empty() || notifier.user_id.is_empty() {
                return Err(ConfigError::Validation(
                    "notifier requires skill_id and user_id".to_string(),
                ));
            }
            if notifier.token.is_empty() {
                return Err(ConfigError::Validation(
                    "notifier requires a token (file or HOMELINK_TOKEN)".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
