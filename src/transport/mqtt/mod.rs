//! MQTT transport for garden telemetry
//!
//! The client is split the same way throughout:
//!
//! - [`connection`] - Pure connection state, errors and broker options
//! - [`message_handler`] - Pure routing of event loop output
//! - [`client`] - Impure I/O operations and the event loop task
//!
//! # Usage
//!
//! ```rust,no_run
//! use garden_telemetry::config::MqttSection;
//! use garden_telemetry::transport::mqtt::MqttClient;
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "mqtt://localhost:1883".to_string(),
//!     ..MqttSection::default()
//! };
//!
//! let mut client = MqttClient::new("bed-1", config)?;
//! client.connect().await?;
//! client.publish("smartGarden/data", b"{}".to_vec())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

pub use client::MqttClient;
pub use connection::{configure_mqtt_options, ConnectionState, MqttError};
pub use message_handler::{EventRoute, MessageHandler};
