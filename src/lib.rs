//! Garden Telemetry
//!
//! Firmware-style runtime for a smart-garden sensor node: it joins a wireless
//! network, opens an MQTT session, and every cycle reads temperature,
//! humidity and soil moisture and publishes them as one compact JSON message.
//!
//! # Overview
//!
//! - [`sensor`] - the sensor reading layer (Linux IIO or simulated)
//! - [`protocol`] - the wire payload and channel validation
//! - [`publisher`] - one publish over an established session
//! - [`cycle`] - the connect-then-cycle-forever driver
//! - [`network`] and [`transport`] - Wi-Fi association and the MQTT client
//!
//! # Quick Start
//!
//! ```rust
//! use garden_telemetry::protocol::Payload;
//! use garden_telemetry::sensor::Reading;
//!
//! let reading = Reading::new(23.5, 60.2, 512);
//! let payload = Payload::encode(&reading);
//!
//! assert_eq!(
//!     payload.as_str(),
//!     r#"{"temperature":23.50,"humidity":60.20,"soilMoisture":512}"#
//! );
//! ```

pub mod config;
pub mod cycle;
pub mod error;
pub mod network;
pub mod observability;
pub mod protocol;
pub mod publisher;
pub mod sensor;
pub mod testing;
pub mod transport;

pub use config::*;
pub use cycle::{CycleDriver, CycleError, CycleOutcome, CycleSettings, CycleStats, DriverState};
pub use error::{GardenError, GardenResult};
pub use protocol::*;
pub use publisher::{PublishOutcome, TelemetryPublisher};
pub use sensor::{Reading, SensorReader, SoilMoisture};
pub use transport::mqtt::MqttClient;
