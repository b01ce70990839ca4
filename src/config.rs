//! Configuration system for the garden telemetry node
//!
//! Loaded from a TOML file. Secrets never live in the file: the Wi-Fi
//! passphrase is referenced by the name of an environment variable and
//! resolved at runtime.

use crate::protocol::topics::{validate_channel, validate_device_id, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BROKER_URL: &str = "mqtt://broker.hivemq.com:1883";
pub const DEFAULT_CHANNEL: &str = "smartGarden/data";

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GardenConfig {
    pub device: DeviceSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub sensors: SensorSection,
    #[serde(default)]
    pub cycle: CycleSection,
}

/// Device identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// Device identifier (must match [a-zA-Z0-9._-]+), used in the MQTT client id
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// How the node brings up its network link
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkBackend {
    /// Associate with a WPA-PSK network through NetworkManager's `nmcli`
    #[default]
    Nmcli,
    /// The link is managed elsewhere (wired, or brought up by the OS)
    Preset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    #[serde(default)]
    pub backend: NetworkBackend,
    /// Wireless network name
    #[serde(default)]
    pub ssid: String,
    /// Environment variable containing the pre-shared key
    pub passphrase_env: Option<String>,
    /// Wireless interface to use (nmcli picks one when absent)
    pub interface: Option<String>,
    /// Fixed delay between association attempts, in seconds
    #[serde(default = "default_network_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            backend: NetworkBackend::default(),
            ssid: String::new(),
            passphrase_env: None,
            interface: None,
            retry_delay_secs: default_network_retry_delay(),
        }
    }
}

fn default_network_retry_delay() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// MQTT broker URL with protocol and port
    #[serde(default = "default_broker_url")]
    pub broker_url: String,
    /// Channel every reading is published to
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// How long to wait for the broker's ConnAck before the handshake counts as failed
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            channel: default_channel(),
            keep_alive_secs: default_keep_alive(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_broker_url() -> String {
    DEFAULT_BROKER_URL.to_string()
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_keep_alive() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

/// Where readings come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackend {
    /// Deterministic synthetic values for bench runs
    #[default]
    Simulated,
    /// Linux Industrial I/O devices (dht11 driver + an ADC)
    Iio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorSection {
    #[serde(default)]
    pub backend: SensorBackend,
    /// IIO device directory of the temperature/humidity sensor
    pub climate_device: Option<PathBuf>,
    /// IIO device directory of the ADC wired to the moisture probe
    pub moisture_device: Option<PathBuf>,
    #[serde(default)]
    pub moisture_channel: u8,
    /// Resolution of the ADC; raw values are rescaled to 10 bits
    #[serde(default = "default_adc_bits")]
    pub adc_bits: u8,
    /// Simulated backend only: drop the climate reading every N reads
    pub dropout_every: Option<u32>,
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            backend: SensorBackend::default(),
            climate_device: None,
            moisture_device: None,
            moisture_channel: 0,
            adc_bits: default_adc_bits(),
            dropout_every: None,
        }
    }
}

fn default_adc_bits() -> u8 {
    10
}

/// What a cycle does when the climate sensor returned no value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidReadingPolicy {
    /// Publish anyway, with the sentinel literal in place of the missing value
    #[default]
    Publish,
    /// Skip this cycle's publish
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleSection {
    #[serde(default = "default_cycle_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub on_invalid_reading: InvalidReadingPolicy,
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            interval_secs: default_cycle_interval(),
            on_invalid_reading: InvalidReadingPolicy::default(),
        }
    }
}

fn default_cycle_interval() -> u64 {
    10
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid device ID format: {0}")]
    InvalidDeviceId(String),
    #[error("Invalid channel: {0}")]
    InvalidChannel(#[source] ValidationError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GardenConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: GardenConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_device_id(&self.device.id)
            .map_err(|e| ConfigError::InvalidDeviceId(format!("'{}': {e}", self.device.id)))?;

        validate_channel(&self.mqtt.channel).map_err(ConfigError::InvalidChannel)?;

        let scheme = self
            .mqtt
            .broker_url
            .split_once("://")
            .map(|(scheme, _)| scheme);
        if !matches!(scheme, Some("mqtt") | Some("mqtts")) {
            return Err(ConfigError::InvalidConfig(format!(
                "broker_url '{}' must use mqtt:// or mqtts://",
                self.mqtt.broker_url
            )));
        }

        if self.network.backend == NetworkBackend::Nmcli && self.network.ssid.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "network.ssid is required for the nmcli backend".to_string(),
            ));
        }

        if self.sensors.backend == SensorBackend::Iio
            && (self.sensors.climate_device.is_none() || self.sensors.moisture_device.is_none())
        {
            return Err(ConfigError::InvalidConfig(
                "sensors.climate_device and sensors.moisture_device are required for the iio backend"
                    .to_string(),
            ));
        }

        if !(1..=16).contains(&self.sensors.adc_bits) {
            return Err(ConfigError::InvalidConfig(format!(
                "sensors.adc_bits must be between 1 and 16, got {}",
                self.sensors.adc_bits
            )));
        }

        if self.sensors.dropout_every == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "sensors.dropout_every must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("cycle.interval_secs", self.cycle.interval_secs),
            ("network.retry_delay_secs", self.network.retry_delay_secs),
            ("mqtt.keep_alive_secs", self.mqtt.keep_alive_secs),
            ("mqtt.connect_timeout_secs", self.mqtt.connect_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        // CONNECT carries keep-alive as a 16-bit field
        if self.mqtt.keep_alive_secs > u64::from(u16::MAX) {
            return Err(ConfigError::InvalidConfig(format!(
                "mqtt.keep_alive_secs must be at most {}, got {}",
                u16::MAX,
                self.mqtt.keep_alive_secs
            )));
        }

        Ok(())
    }

    /// Get the Wi-Fi passphrase from its environment variable.
    ///
    /// `None` when no variable is configured (open network); an error when the
    /// variable is configured but not set.
    pub fn get_network_passphrase(&self) -> Result<Option<String>, ConfigError> {
        match &self.network.passphrase_env {
            Some(name) => std::env::var(name)
                .map(Some)
                .map_err(|_| ConfigError::EnvVarNotFound(name.clone())),
            None => Ok(None),
        }
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[device]
id = "test-garden"
description = "A test garden node"

[network]
backend = "preset"

[mqtt]
broker_url = "mqtt://localhost:1883"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
