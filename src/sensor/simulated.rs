//! Deterministic stand-in sensors for bench runs without hardware attached

use super::{ClimateSample, ClimateSensor, MoistureSensor, SoilMoisture};
use async_trait::async_trait;
use tracing::debug;

const BASE_TEMPERATURE: f32 = 22.0;
const BASE_HUMIDITY: f32 = 55.0;
const WET_SOIL: u16 = 720;
const DRY_SOIL: u16 = 300;
const DRYING_PER_READ: u16 = 4;

/// Climate sensor that drifts through a fixed, repeating pattern
#[derive(Debug, Default)]
pub struct SimulatedClimate {
    reads: u32,
    dropout_every: Option<u32>,
}

impl SimulatedClimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `every`-th read comes back empty, like a DHT sensor missing its timing window
    pub fn with_dropout(every: u32) -> Self {
        Self {
            reads: 0,
            dropout_every: Some(every.max(1)),
        }
    }
}

#[async_trait]
impl ClimateSensor for SimulatedClimate {
    async fn read_climate(&mut self) -> ClimateSample {
        let tick = self.reads;
        self.reads = self.reads.wrapping_add(1);

        if let Some(every) = self.dropout_every {
            if self.reads % every == 0 {
                debug!(read = self.reads, "Simulated climate dropout");
                return ClimateSample::default();
            }
        }

        ClimateSample {
            temperature: Some(BASE_TEMPERATURE + (tick % 12) as f32 * 0.25),
            humidity: Some(BASE_HUMIDITY + (tick % 8) as f32 * 0.5),
        }
    }
}

/// Moisture probe in soil that slowly dries out and gets watered again
#[derive(Debug)]
pub struct SimulatedMoisture {
    level: u16,
}

impl SimulatedMoisture {
    pub fn new() -> Self {
        Self { level: WET_SOIL }
    }
}

impl Default for SimulatedMoisture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoistureSensor for SimulatedMoisture {
    async fn read_moisture(&mut self) -> SoilMoisture {
        let current = self.level;
        self.level = match current.saturating_sub(DRYING_PER_READ) {
            level if level < DRY_SOIL => WET_SOIL,
            level => level,
        };
        SoilMoisture::new(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_climate_pattern_is_deterministic() {
        let mut first = SimulatedClimate::new();
        let mut second = SimulatedClimate::new();

        for _ in 0..30 {
            assert_eq!(first.read_climate().await, second.read_climate().await);
        }
    }

    #[tokio::test]
    async fn test_first_climate_sample() {
        let mut climate = SimulatedClimate::new();
        let sample = climate.read_climate().await;

        assert_eq!(sample.temperature, Some(22.0));
        assert_eq!(sample.humidity, Some(55.0));
    }

    #[tokio::test]
    async fn test_dropout_every_third_read() {
        let mut climate = SimulatedClimate::with_dropout(3);

        let samples = [
            climate.read_climate().await,
            climate.read_climate().await,
            climate.read_climate().await,
            climate.read_climate().await,
        ];

        assert!(samples[0].temperature.is_some());
        assert!(samples[1].temperature.is_some());
        assert_eq!(samples[2], ClimateSample::default());
        assert!(samples[3].temperature.is_some());
    }

    #[tokio::test]
    async fn test_moisture_dries_then_resets() {
        let mut moisture = SimulatedMoisture::new();
        let mut previous = moisture.read_moisture().await.value();
        assert_eq!(previous, WET_SOIL);

        let mut watered = false;
        for _ in 0..200 {
            let current = moisture.read_moisture().await.value();
            assert!((DRY_SOIL..=WET_SOIL).contains(&current));
            if current > previous {
                watered = true;
                assert_eq!(current, WET_SOIL);
            }
            previous = current;
        }

        assert!(watered, "soil should be re-watered after drying out");
    }
}
