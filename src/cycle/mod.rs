//! The sensor cycle
//!
//! [`CycleDriver`] takes the node from power-up to an endless loop of
//! read, encode, publish, wait. Its lifecycle:
//!
//! ```text
//! Connecting --network joined, broker ConnAck--> Running (forever)
//!     |
//!     +--broker handshake failed--> Halted(reason)
//! ```
//!
//! Network association failures are retried with a fixed delay for as long as
//! it takes. A failed broker handshake is terminal.

use crate::config::{GardenConfig, InvalidReadingPolicy};
use crate::publisher::PublishOutcome;
use std::time::Duration;
use thiserror::Error;

pub mod driver;
pub mod schedule;

pub use driver::CycleDriver;
pub use schedule::CycleSchedule;

/// Timing and publish settings for the cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub channel: String,
    pub interval: Duration,
    pub retry_delay: Duration,
    pub on_invalid_reading: InvalidReadingPolicy,
}

impl CycleSettings {
    pub fn from_config(config: &GardenConfig) -> Self {
        Self {
            channel: config.mqtt.channel.clone(),
            interval: Duration::from_secs(config.cycle.interval_secs),
            retry_delay: Duration::from_secs(config.network.retry_delay_secs),
            on_invalid_reading: config.cycle.on_invalid_reading,
        }
    }
}

/// Driver lifecycle state
#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    Connecting,
    Running,
    /// Terminal; carries the reason the broker handshake failed
    Halted(String),
}

/// What one cycle did with its reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published(PublishOutcome),
    /// Incomplete reading suppressed by the `skip` policy
    Skipped,
}

/// Running totals since the driver started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub delivered: u64,
    pub failed: u64,
    pub skipped: u64,
    pub invalid_readings: u64,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Broker handshake failed: {0}")]
    BrokerHandshake(String),
    #[error("Driver halted: {0}")]
    Halted(String),
    #[error("Driver is not running")]
    NotRunning,
}
