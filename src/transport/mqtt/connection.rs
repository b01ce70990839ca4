//! Pure connection state management for the MQTT client
//!
//! Connection states, transport errors and broker option construction live
//! here so they can be tested without a broker.

use crate::config::MqttSection;
use rumqttc::v5::{mqttbytes::QoS, MqttOptions};
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Readings are fire-and-forget: delivered at most once, never retained
pub const TELEMETRY_QOS: QoS = QoS::AtMostOnce;
pub const TELEMETRY_RETAIN: bool = false;

/// Pause before polling the event loop again after a dropped connection
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Connection state for MQTT client
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Waiting for the broker's ConnAck
    Connecting,
    /// Handshake complete, publishing allowed
    Connected,
    /// Disconnected with reason
    Disconnected(String),
}

impl ConnectionState {
    pub fn can_publish(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
    #[error("Broker handshake failed: {0}")]
    HandshakeFailed(String),
}

/// Split a broker URL into host, port and whether TLS is required
pub fn parse_broker_url(broker_url: &str) -> Result<(String, u16, bool), MqttError> {
    let url =
        Url::parse(broker_url).map_err(|_| MqttError::InvalidBrokerUrl(broker_url.to_string()))?;

    let tls = match url.scheme() {
        "mqtt" => false,
        "mqtts" => true,
        _ => return Err(MqttError::InvalidBrokerUrl(broker_url.to_string())),
    };

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| MqttError::InvalidBrokerUrl(broker_url.to_string()))?;
    let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

    Ok((host.to_string(), port, tls))
}

/// Build a client id unique per connection so a rebooted node never collides with its own stale session
pub fn build_client_id(device_id: &str) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("garden-{device_id}-{timestamp}")
}

/// Pure function to configure MQTT options from config
pub fn configure_mqtt_options(
    device_id: &str,
    config: &MqttSection,
) -> Result<MqttOptions, MqttError> {
    let (host, port, tls) = parse_broker_url(&config.broker_url)?;

    let mut mqtt_options = MqttOptions::new(build_client_id(device_id), host, port);

    if tls {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    mqtt_options.set_clean_start(true);

    Ok(mqtt_options)
}
