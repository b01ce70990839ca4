//! Sensor reading layer
//!
//! A [`SensorReader`] produces one fresh [`Reading`] per call and never fails:
//! a climate value the hardware could not deliver is simply absent, and soil
//! moisture is always a raw ADC count clamped into `[0, 1023]`.
//!
//! [`SensorSuite`] composes the two physical sensors of a garden node, a
//! temperature/humidity sensor ([`ClimateSensor`]) and an analog moisture
//! probe ([`MoistureSensor`]).

use crate::config::{ConfigError, SensorBackend, SensorSection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod iio;
pub mod simulated;

/// Highest soil moisture value; the scale of a 10-bit ADC
pub const MOISTURE_MAX: u16 = 1023;

/// Raw soil moisture count in `[0, 1023]`, lower means drier soil
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u16", from = "u16")]
pub struct SoilMoisture(u16);

impl SoilMoisture {
    /// Saturates values above [`MOISTURE_MAX`]
    pub fn new(raw: u16) -> Self {
        Self(raw.min(MOISTURE_MAX))
    }

    /// Rescale a raw conversion from an ADC of `adc_bits` resolution to the 10-bit scale
    pub fn from_adc(raw: u32, adc_bits: u8) -> Self {
        let bits = u32::from(adc_bits.clamp(1, 16));
        let full_scale = (1u64 << bits) - 1;
        let raw = u64::from(raw).min(full_scale);
        let scaled = raw * u64::from(MOISTURE_MAX) / full_scale;
        Self::new(scaled as u16)
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for SoilMoisture {
    fn from(raw: u16) -> Self {
        Self::new(raw)
    }
}

impl From<SoilMoisture> for u16 {
    fn from(moisture: SoilMoisture) -> Self {
        moisture.0
    }
}

/// One sample of all three garden sensors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    /// Degrees Celsius, absent when the sensor did not answer
    pub temperature: Option<f32>,
    /// Relative humidity in percent, absent when the sensor did not answer
    pub humidity: Option<f32>,
    pub soil_moisture: SoilMoisture,
}

impl Reading {
    /// Build a reading from raw sensor values; NaN or infinite values become absent
    pub fn new(temperature: f32, humidity: f32, soil_moisture: u16) -> Self {
        Self::from_parts(
            Some(temperature),
            Some(humidity),
            SoilMoisture::new(soil_moisture),
        )
    }

    pub fn from_parts(
        temperature: Option<f32>,
        humidity: Option<f32>,
        soil_moisture: SoilMoisture,
    ) -> Self {
        Self {
            temperature: temperature.filter(|t| t.is_finite()),
            humidity: humidity.filter(|h| h.is_finite()),
            soil_moisture,
        }
    }

    /// True when both climate values are present and finite
    pub fn is_complete(&self) -> bool {
        self.temperature.is_some_and(f32::is_finite) && self.humidity.is_some_and(f32::is_finite)
    }
}

/// Temperature and humidity from one sensor transaction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateSample {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

/// Produces the reading for one cycle
#[async_trait]
pub trait SensorReader: Send {
    async fn read(&mut self) -> Reading;
}

#[async_trait]
impl<S: SensorReader + ?Sized> SensorReader for Box<S> {
    async fn read(&mut self) -> Reading {
        (**self).read().await
    }
}

/// A combined temperature/humidity sensor (DHT22 and friends)
#[async_trait]
pub trait ClimateSensor: Send {
    async fn read_climate(&mut self) -> ClimateSample;
}

/// An analog soil moisture probe behind an ADC
#[async_trait]
pub trait MoistureSensor: Send {
    async fn read_moisture(&mut self) -> SoilMoisture;
}

/// The node's climate sensor and moisture probe, read together
pub struct SensorSuite<C, M> {
    climate: C,
    moisture: M,
}

impl<C, M> SensorSuite<C, M>
where
    C: ClimateSensor,
    M: MoistureSensor,
{
    pub fn new(climate: C, moisture: M) -> Self {
        Self { climate, moisture }
    }
}

#[async_trait]
impl<C, M> SensorReader for SensorSuite<C, M>
where
    C: ClimateSensor,
    M: MoistureSensor,
{
    async fn read(&mut self) -> Reading {
        let climate = self.climate.read_climate().await;
        let soil_moisture = self.moisture.read_moisture().await;

        Reading::from_parts(climate.temperature, climate.humidity, soil_moisture)
    }
}

/// Build the sensor reader selected in configuration
pub fn build_sensor_reader(config: &SensorSection) -> Result<Box<dyn SensorReader>, ConfigError> {
    match config.backend {
        SensorBackend::Simulated => {
            let climate = match config.dropout_every {
                Some(every) => simulated::SimulatedClimate::with_dropout(every),
                None => simulated::SimulatedClimate::new(),
            };
            Ok(Box::new(SensorSuite::new(
                climate,
                simulated::SimulatedMoisture::new(),
            )))
        }
        SensorBackend::Iio => {
            let climate_device = config.climate_device.clone().ok_or_else(|| {
                ConfigError::InvalidConfig("sensors.climate_device is not set".to_string())
            })?;
            let moisture_device = config.moisture_device.clone().ok_or_else(|| {
                ConfigError::InvalidConfig("sensors.moisture_device is not set".to_string())
            })?;

            Ok(Box::new(SensorSuite::new(
                iio::IioClimateSensor::new(climate_device),
                iio::IioMoistureSensor::new(
                    moisture_device,
                    config.moisture_channel,
                    config.adc_bits,
                ),
            )))
        }
    }
}
