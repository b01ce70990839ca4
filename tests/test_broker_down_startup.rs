//! Integration tests for node startup when the broker is down
//!
//! A node that cannot complete the MQTT handshake must stop for good: no
//! sensor reads, no publishes, and a fatal error for the binary to exit on.


use garden_telemetry::config::MqttSection;
use garden_telemetry::cycle::{CycleDriver, CycleError, CycleSettings, DriverState};
use garden_telemetry::sensor::Reading;
use garden_telemetry::testing::mocks::{MockNetworkLink, MockSensor};
use garden_telemetry::transport::mqtt::{MqttClient, MqttError};
use std::time::Duration;
use tokio::time::timeout;

fn unreachable_broker() -> MqttSection {
    MqttSection {
        // Nothing listens on port 1; the TCP connect is refused immediately
        broker_url: "mqtt://127.0.0.1:1".to_string(),
        connect_timeout_secs: 2,
        ..MqttSection::default()
    }
}

#[tokio::test]
async fn test_client_reports_handshake_failure_when_broker_unavailable() {
    let mut client = MqttClient::new("startup-garden", unreachable_broker())
        .expect("Client creation should succeed even if broker is down");

    let connect_result = timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("Handshake failure must be reported within the connect timeout");

    assert!(matches!(connect_result, Err(MqttError::HandshakeFailed(_))));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_publish_after_failed_handshake_is_rejected() {
    let mut client = MqttClient::new("startup-garden", unreachable_broker()).unwrap();
    let _ = client.connect().await;

    let result = client.publish("smartGarden/data", b"{}".to_vec());

    assert!(matches!(result, Err(MqttError::NotConnected { .. })));
}

#[tokio::test]
async fn test_node_halts_when_broker_unavailable_at_startup() {
    let config = test_helpers::test_config();
    let client = MqttClient::new(&config.device.id, unreachable_broker()).unwrap();
    let sensors = MockSensor::fixed(Reading::new(23.5, 60.2, 512));
    let mut driver = CycleDriver::new(
        CycleSettings::from_config(&config),
        MockNetworkLink::new(),
        client,
        sensors.clone(),
    );

    let result = timeout(Duration::from_secs(5), driver.run())
        .await
        .expect("A failed handshake must end the run");

    assert!(matches!(result, Err(CycleError::BrokerHandshake(_))));
    assert!(matches!(driver.state(), DriverState::Halted(_)));
    assert_eq!(sensors.reads(), 0);
}
