//! Configuration file parsing and structures.
//!
//! hapsync uses a single TOML file: where to reach the object store, how
//! to reach the zigbee broker, and the mapping table declaring which
//! source instances feed which HomeKit bridge instance.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

use crate::sync::Mapping;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    pub gateway: GatewayConfig,

    #[serde(default)]
    pub zigbee: ZigbeeConfig,

    /// Destination instance id to enabled source instances
    #[serde(default)]
    pub mapping: Mapping,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

/// Object store endpoint
#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the object store's REST query API
    pub base_url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

fn default_gateway_timeout() -> u64 {
    30
}

/// Zigbee broker used for the one-shot device directory fetch
#[derive(Debug, Clone, Deserialize)]
pub struct ZigbeeConfig {
    /// Broker hostname or IP address
    #[serde(default = "default_zigbee_broker")]
    pub broker: String,

    /// Broker port
    #[serde(default = "default_zigbee_port")]
    pub port: u16,

    /// MQTT client id
    #[serde(default = "default_zigbee_client_id")]
    pub client_id: String,

    /// Topic carrying the retained device directory
    #[serde(default = "default_devices_topic")]
    pub devices_topic: String,

    /// How long to wait for the directory before giving up, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_zigbee_broker() -> String {
    "127.0.0.1".to_string()
}

fn default_zigbee_port() -> u16 {
    1883
}

fn default_zigbee_client_id() -> String {
    "hapsync".to_string()
}

fn default_devices_topic() -> String {
    "zigbee2mqtt/bridge/devices".to_string()
}

fn default_fetch_timeout() -> u64 {
    10
}

impl Default for ZigbeeConfig {
    fn default() -> Self {
        Self {
            broker: default_zigbee_broker(),
            port: default_zigbee_port(),
            client_id: default_zigbee_client_id(),
            devices_topic: default_devices_topic(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [gateway]
            base_url = "http://127.0.0.1:8087"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.gateway.timeout_secs, 30);
        assert_eq!(config.zigbee.broker, "127.0.0.1");
        assert_eq!(config.zigbee.port, 1883);
        assert_eq!(config.zigbee.devices_topic, "zigbee2mqtt/bridge/devices");
        assert_eq!(config.zigbee.fetch_timeout_secs, 10);
        assert!(config.mapping.is_empty());
    }

    #[test]
    fn test_parse_mapping_table() {
        let toml = r#"
            [logging]
            level = "debug"

            [gateway]
            base_url = "http://iobroker.local:8087/"
            username = "admin"
            password = "secret"

            [zigbee]
            broker = "iobroker.local"
            fetch_timeout_secs = 5

            [mapping."yahka.0"]
            "shelly.0" = true
            "zigbee2mqtt.0" = true
            "tr-064.0" = false
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.zigbee.fetch_timeout_secs, 5);

        let sources = &config.mapping["yahka.0"];
        assert_eq!(sources["shelly.0"], true);
        assert_eq!(sources["tr-064.0"], false);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hapsync.toml");
        std::fs::write(
            &path,
            "[gateway]\nbase_url = \"http://127.0.0.1:8087\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:8087");

        let missing = Config::from_file(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_, _))));
    }
}
