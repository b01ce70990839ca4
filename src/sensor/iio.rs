//! Linux Industrial I/O backend
//!
//! The kernel `dht11` driver (DHT11/DHT22) exposes processed values in milli
//! units under `in_temp_input` and `in_humidityrelative_input`; reading the
//! attribute triggers one sensor transaction. ADCs expose raw conversions
//! under `in_voltageN_raw`.
//!
//! Failures never propagate: a climate attribute that cannot be read becomes
//! an absent value, and an unreadable ADC reports the dry end of the scale.

use super::{ClimateSample, ClimateSensor, MoistureSensor, SoilMoisture};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const TEMPERATURE_ATTR: &str = "in_temp_input";
const HUMIDITY_ATTR: &str = "in_humidityrelative_input";

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unexpected value {value:?} in {path}")]
    Parse { path: PathBuf, value: String },
}

async fn read_attribute(path: &Path) -> Result<String, SensorError> {
    tokio::fs::read_to_string(path)
        .await
        .map(|raw| raw.trim().to_string())
        .map_err(|source| SensorError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a processed attribute reported in milli units
async fn read_milli(path: &Path) -> Result<f32, SensorError> {
    let value = read_attribute(path).await?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| (v / 1000.0) as f32)
        .ok_or_else(|| SensorError::Parse {
            path: path.to_path_buf(),
            value,
        })
}

/// DHT-class temperature/humidity sensor bound to the `dht11` IIO driver
#[derive(Debug, Clone)]
pub struct IioClimateSensor {
    device: PathBuf,
}

impl IioClimateSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }

    async fn read_value(&self, attribute: &str) -> Option<f32> {
        match read_milli(&self.device.join(attribute)).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(device = %self.device.display(), error = %crate::error::describe_error_chain(&e), "Climate sensor read failed");
                None
            }
        }
    }
}

#[async_trait]
impl ClimateSensor for IioClimateSensor {
    async fn read_climate(&mut self) -> ClimateSample {
        ClimateSample {
            temperature: self.read_value(TEMPERATURE_ATTR).await,
            humidity: self.read_value(HUMIDITY_ATTR).await,
        }
    }
}

/// Moisture probe wired to one channel of an IIO ADC
#[derive(Debug, Clone)]
pub struct IioMoistureSensor {
    device: PathBuf,
    channel: u8,
    adc_bits: u8,
}

impl IioMoistureSensor {
    pub fn new(device: impl Into<PathBuf>, channel: u8, adc_bits: u8) -> Self {
        Self {
            device: device.into(),
            channel,
            adc_bits,
        }
    }

    pub fn raw_attribute(&self) -> PathBuf {
        self.device.join(format!("in_voltage{}_raw", self.channel))
    }

    async fn read_raw(&self) -> Result<u32, SensorError> {
        let path = self.raw_attribute();
        let value = read_attribute(&path).await?;
        value
            .parse::<u32>()
            .map_err(|_| SensorError::Parse { path, value })
    }
}

#[async_trait]
impl MoistureSensor for IioMoistureSensor {
    async fn read_moisture(&mut self) -> SoilMoisture {
        match self.read_raw().await {
            Ok(raw) => SoilMoisture::from_adc(raw, self.adc_bits),
            Err(e) => {
                warn!(device = %self.device.display(), error = %crate::error::describe_error_chain(&e), "Moisture ADC read failed");
                SoilMoisture::default()
            }
        }
    }
}
