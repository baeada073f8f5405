//! Configuration file parsing and structures.
//!
//! homecenterd reads one TOML file with logging and API settings and one
//! `[entries.<id>]` table per hub.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::controller::ComponentSpec;
use crate::controller::Credentials;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    /// Key = entry id
    #[serde(default)]
    pub entries: BTreeMap<String, EntryConfig>,
}

#[derive(
    Debug,
    Default,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"homecenter::bridge" = "debug"`
    #[serde(default)]
    pub overrides: BTreeMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Filter directives for this config, e.g. `info,homecenter::bridge=debug`.
    pub fn directives(&self, level: Option<LogLevel>) -> String {
        let mut directives = vec![level.unwrap_or(self.level).as_str().to_string()];
        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level.as_str()));
        }
        directives.join(",")
    }

    /// Build the subscriber filter. `RUST_LOG` wins when it is set.
    pub fn env_filter(&self, level: Option<LogLevel>) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives(level)))
    }
}

/// HTTP API configuration
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,

    #[serde(default = "default_api_listen")]
    pub listen: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8565
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
            port: default_api_port(),
        }
    }
}

/// One hub connection.
#[derive(Debug, Deserialize)]
pub struct EntryConfig {
    pub address: String,
    pub port: u16,
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Inventory of the simulated hub
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl EntryConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone(),
            self.password.clone(),
            format!("{}:{}", self.address, self.port),
        )
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject entries that cannot possibly connect. Duplicate component ids
    /// only warn; the registry drops the later ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (entry_id, entry) in &self.entries {
            if entry.address.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "entries.{}: address must not be empty",
                    entry_id
                )));
            }
            if entry.port == 0 {
                return Err(ConfigError::Validation(format!(
                    "entries.{}: port must not be 0",
                    entry_id
                )));
            }
            if entry.username.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "entries.{}: username must not be empty",
                    entry_id
                )));
            }

            let mut seen = HashSet::new();
            for component in &entry.components {
                if !seen.insert(component.id) {
                    warn!(
                        "entries.{}: component id {} is listed more than once",
                        entry_id, component.id
                    );
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DeviceKind;

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.api.enabled);
        assert_eq!(config.api.port, 8565);
        assert!(config.entries.is_empty());
    }

    #[test]
    fn test_parse_entry() {
        let toml = r#"
            [logging]
            level = "debug"

            [logging.overrides]
            "homecenter::bridge" = "trace"

            [api]
            enabled = false

            [entries.living_room]
            address = "192.168.1.20"
            port = 4000
            username = "admin"
            password = "secret"

            [[entries.living_room.components]]
            id = 7
            kind = "light"
            name = "Kitchen"

            [[entries.living_room.components]]
            id = 9
            kind = "thermostat"
            name = "Living"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(!config.api.enabled);

        let entry = &config.entries["living_room"];
        assert_eq!(entry.credentials().address, "192.168.1.20:4000");
        assert_eq!(entry.components.len(), 2);
        assert_eq!(entry.components[1].kind, DeviceKind::Thermostat);
    }

    #[test]
    fn test_directives() {
        let mut logging = LoggingConfig::default();
        logging
            .overrides
            .insert("homecenter::bridge".to_string(), LogLevel::Debug);
        assert_eq!(logging.directives(None), "info,homecenter::bridge=debug");
        assert_eq!(
            logging.directives(Some(LogLevel::Warn)),
            "warn,homecenter::bridge=debug"
        );
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let toml = r#"
            [entries.hub]
            address = "hub.local"
            port = 0
            username = "admin"
        "#;
        assert!(matches!(
            Config::parse(toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let toml = r#"
            [entries.hub]
            address = "hub.local"
            port = 4000
            username = "admin"

            [[entries.hub.components]]
            id = 1
            kind = "dimmer"
            name = "Hall"
        "#;
        assert!(matches!(Config::parse(toml), Err(ConfigError::Parse(_))));
    }
}
