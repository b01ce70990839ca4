//! Transport layer for garden telemetry
//!
//! This module provides the broker abstraction the cycle publishes through,
//! and its MQTT implementation.

pub mod mqtt;

/// Transport trait for telemetry delivery
///
/// This trait provides an abstraction over the broker connection to enable
/// dependency injection and testing.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open the broker session; an error here is a failed handshake
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Disconnect from the broker
    async fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Send one message on a channel over the established session
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), Self::Error>;

    /// Check if transport is currently connected
    fn is_connected(&self) -> bool;

    /// Get current connection state
    fn connection_state(&self) -> Option<crate::transport::mqtt::ConnectionState>;
}

/// Type alias for MQTT transport
pub type MqttTransport = mqtt::MqttClient;
