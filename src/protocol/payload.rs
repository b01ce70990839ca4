//! Wire format of a garden reading
//!
//! One reading per message, as a compact JSON object with a fixed key order:
//!
//! ```text
//! {"temperature":23.50,"humidity":60.20,"soilMoisture":512}
//! ```
//!
//! Floats always carry two decimals. A climate value the sensor could not
//! deliver is written as [`ABSENT_SENTINEL`] so every message has all three
//! keys mapped to numbers.

use crate::sensor::{Reading, SoilMoisture, MOISTURE_MAX};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Stand-in for an absent temperature or humidity
pub const ABSENT_SENTINEL: f32 = -999.0;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Soil moisture {0} is outside 0..=1023")]
    MoistureOutOfRange(u64),
}

/// Encoded form of one [`Reading`], ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    pub fn encode(reading: &Reading) -> Self {
        Self(format!(
            r#"{{"temperature":{},"humidity":{},"soilMoisture":{}}}"#,
            format_climate(reading.temperature),
            format_climate(reading.humidity),
            reading.soil_moisture.value()
        ))
    }

    /// Parse a message received from the broker back into a reading
    pub fn decode(bytes: &[u8]) -> Result<Reading, PayloadError> {
        let wire: WireReading = serde_json::from_slice(bytes)?;

        if wire.soil_moisture > u64::from(MOISTURE_MAX) {
            return Err(PayloadError::MoistureOutOfRange(wire.soil_moisture));
        }

        Ok(Reading::from_parts(
            parse_climate(wire.temperature),
            parse_climate(wire.humidity),
            SoilMoisture::new(wire.soil_moisture as u16),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_climate(value: Option<f32>) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(ABSENT_SENTINEL);
    format!("{value:.2}")
}

fn parse_climate(value: f64) -> Option<f32> {
    if value == f64::from(ABSENT_SENTINEL) {
        None
    } else {
        Some(value as f32)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireReading {
    temperature: f64,
    humidity: f64,
    #[serde(rename = "soilMoisture")]
    soil_moisture: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use regex::Regex;

    fn climate_value() -> impl Strategy<Value = Option<f32>> {
        prop_oneof![
            (-40.0f32..85.0).prop_map(Some),
            Just(None),
            Just(Some(f32::NAN)),
            Just(Some(f32::INFINITY)),
        ]
    }

    fn wire_shape() -> Regex {
        Regex::new(
            r#"^\{"temperature":-?\d+\.\d{2},"humidity":-?\d+\.\d{2},"soilMoisture":\d+\}$"#,
        )
        .unwrap()
    }

    fn any_reading() -> impl Strategy<Value = Reading> {
        (climate_value(), climate_value(), any::<u16>()).prop_map(|(t, h, m)| Reading {
            temperature: t,
            humidity: h,
            soil_moisture: SoilMoisture::new(m),
        })
    }

    proptest! {
        #[test]
        fn keys_appear_once_in_fixed_order(reading in any_reading()) {
            let payload = Payload::encode(&reading);
            let text = payload.as_str();

            let t = text.find("\"temperature\":").unwrap();
            let h = text.find("\"humidity\":").unwrap();
            let m = text.find("\"soilMoisture\":").unwrap();
            prop_assert!(t < h && h < m);
            prop_assert_eq!(text.matches(':').count(), 3);
        }

        #[test]
        fn encoding_is_pure(reading in any_reading()) {
            prop_assert_eq!(Payload::encode(&reading), Payload::encode(&reading));
        }

        #[test]
        fn every_payload_is_numeric_json(reading in any_reading()) {
            let payload = Payload::encode(&reading);
            let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
            let object = value.as_object().unwrap();

            prop_assert_eq!(object.len(), 3);
            prop_assert!(object.values().all(serde_json::Value::is_number));
            prop_assert!(object["soilMoisture"].as_u64().unwrap() <= u64::from(MOISTURE_MAX));
        }

        #[test]
        fn floats_have_exactly_two_decimals(reading in any_reading()) {
            let payload = Payload::encode(&reading);

            prop_assert!(
                wire_shape().is_match(payload.as_str()),
                "unexpected literal layout: {}",
                payload
            );
        }
    }

    #[test]
    fn test_three_decimal_rendering_is_not_wire_shaped() {
        assert!(!wire_shape().is_match(r#"{"temperature":23.500,"humidity":60.200,"soilMoisture":512}"#));
        assert!(wire_shape().is_match(r#"{"temperature":-999.00,"humidity":60.20,"soilMoisture":0}"#));
    }

    #[test]
    fn test_reference_reading() {
        let reading = Reading::new(23.5, 60.2, 512);

        assert_eq!(
            Payload::encode(&reading).as_str(),
            r#"{"temperature":23.50,"humidity":60.20,"soilMoisture":512}"#
        );
    }

    #[test]
    fn test_absent_values_use_sentinel() {
        let reading = Reading::from_parts(None, Some(f32::NAN), SoilMoisture::new(0));

        assert_eq!(
            Payload::encode(&reading).to_string(),
            r#"{"temperature":-999.00,"humidity":-999.00,"soilMoisture":0}"#
        );
    }

    #[test]
    fn test_negative_temperature() {
        let payload = Payload::encode(&Reading::new(-3.25, 90.0, 1023));

        assert_eq!(
            payload.as_str(),
            r#"{"temperature":-3.25,"humidity":90.00,"soilMoisture":1023}"#
        );
    }

    #[test]
    fn test_decode_wire_message() {
        let reading =
            Payload::decode(br#"{"temperature":23.50,"humidity":60.20,"soilMoisture":512}"#)
                .unwrap();

        assert_eq!(reading.temperature, Some(23.5));
        assert_eq!(reading.humidity, Some(60.2));
        assert_eq!(reading.soil_moisture.value(), 512);
    }

    #[test]
    fn test_decode_sentinel_is_absent() {
        let reading =
            Payload::decode(br#"{"temperature":-999.00,"humidity":41.00,"soilMoisture":7}"#)
                .unwrap();

        assert_eq!(reading.temperature, None);
        assert_eq!(reading.humidity, Some(41.0));
        assert!(!reading.is_complete());
    }

    #[test]
    fn test_decode_rejects_out_of_range_moisture() {
        let err = Payload::decode(br#"{"temperature":1.00,"humidity":2.00,"soilMoisture":4095}"#)
            .unwrap_err();

        assert!(matches!(err, PayloadError::MoistureOutOfRange(4095)));
    }

    #[test]
    fn test_decode_rejects_unknown_and_missing_keys() {
        assert!(Payload::decode(br#"{"temperature":1.00,"humidity":2.00}"#).is_err());
        assert!(Payload::decode(
            br#"{"temperature":1.00,"humidity":2.00,"soilMoisture":3,"battery":4}"#
        )
        .is_err());
        assert!(Payload::decode(b"not json").is_err());
    }

    #[test]
    fn test_bytes_match_text() {
        let payload = Payload::encode(&Reading::new(20.0, 50.0, 100));

        assert_eq!(payload.as_bytes(), payload.as_str().as_bytes());
        assert_eq!(payload.clone().into_bytes(), payload.as_bytes().to_vec());
    }
}
