//! Wire format tests: what a subscriber on `smartGarden/data` actually receives

use garden_telemetry::protocol::{Payload, PayloadError, ABSENT_SENTINEL};
use garden_telemetry::sensor::{Reading, SoilMoisture};

#[test]
fn test_reference_reading_encodes_exactly() {
    let payload = Payload::encode(&Reading::new(23.5, 60.2, 512));

    assert_eq!(
        payload.as_str(),
        r#"{"temperature":23.50,"humidity":60.20,"soilMoisture":512}"#
    );
}

#[test]
fn test_payload_is_valid_json_with_three_numeric_keys() {
    let payload = Payload::encode(&Reading::new(-4.25, 99.999, 0));

    let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(object.len(), 3);
    assert!(object.values().all(serde_json::Value::is_number));
    assert_eq!(
        payload.as_str(),
        r#"{"temperature":-4.25,"humidity":100.00,"soilMoisture":0}"#
    );
}

#[test]
fn test_absent_climate_values_use_sentinel() {
    let reading = Reading::from_parts(None, Some(41.0), SoilMoisture::new(1023));

    assert_eq!(
        Payload::encode(&reading).as_str(),
        r#"{"temperature":-999.00,"humidity":41.00,"soilMoisture":1023}"#
    );
    assert_eq!(ABSENT_SENTINEL, -999.0);
}

#[test]
fn test_non_finite_values_use_sentinel() {
    let reading = Reading::from_parts(Some(f32::NAN), Some(f32::INFINITY), SoilMoisture::new(7));

    assert_eq!(
        Payload::encode(&reading).as_str(),
        r#"{"temperature":-999.00,"humidity":-999.00,"soilMoisture":7}"#
    );
}

#[test]
fn test_decode_reads_published_message() {
    let reading =
        Payload::decode(br#"{"temperature":23.50,"humidity":60.20,"soilMoisture":512}"#).unwrap();

    assert_eq!(reading.temperature, Some(23.5));
    assert_eq!(reading.humidity, Some(60.2));
    assert_eq!(reading.soil_moisture.value(), 512);
}

#[test]
fn test_decode_rejects_foreign_messages() {
    assert!(matches!(
        Payload::decode(b"hello"),
        Err(PayloadError::Malformed(_))
    ));
    assert!(matches!(
        Payload::decode(br#"{"temperature":1.00,"humidity":2.00}"#),
        Err(PayloadError::Malformed(_))
    ));
    assert!(matches!(
        Payload::decode(br#"{"temperature":1.00,"humidity":2.00,"soilMoisture":3,"extra":1}"#),
        Err(PayloadError::Malformed(_))
    ));
    assert!(matches!(
        Payload::decode(br#"{"temperature":1.00,"humidity":2.00,"soilMoisture":4096}"#),
        Err(PayloadError::MoistureOutOfRange(4096))
    ));
}
