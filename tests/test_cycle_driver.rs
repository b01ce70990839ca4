//! End-to-end tests of the sensor cycle against mock network, broker and sensors
//!
//! Time is paused so the fixed delays can be asserted exactly.


use garden_telemetry::config::InvalidReadingPolicy;
use garden_telemetry::cycle::{CycleDriver, CycleError, CycleSettings, DriverState};
use garden_telemetry::protocol::Payload;
use garden_telemetry::sensor::{Reading, SoilMoisture};
use garden_telemetry::testing::mocks::{MockNetworkLink, MockSensor, MockTransport};
use std::time::Duration;
use test_helpers::{mock_driver, test_config};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_network_retries_until_joined() {
    let link = MockNetworkLink::failing_times(3);
    let transport = MockTransport::new();
    let mut driver = mock_driver(
        link.clone(),
        transport.clone(),
        MockSensor::fixed(Reading::new(23.5, 60.2, 512)),
    );
    let start = Instant::now();

    driver.connect().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(15));
    assert_eq!(link.attempts(), 4);
    assert_eq!(driver.state(), &DriverState::Running);
    assert_eq!(transport.connect_attempts(), 1);

    let attempt_times = link.get_attempt_times().await;
    for pair in attempt_times.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(5));
    }
}

#[tokio::test(start_paused = true)]
async fn test_broker_is_not_contacted_before_network_joins() {
    let link = MockNetworkLink::failing_times(2);
    let transport = MockTransport::new();
    let mut driver = mock_driver(
        link.clone(),
        transport.clone(),
        MockSensor::fixed(Reading::new(23.5, 60.2, 512)),
    );

    let connecting = tokio::time::timeout(Duration::from_secs(7), driver.connect()).await;

    assert!(connecting.is_err(), "connect should still be retrying the network");
    assert_eq!(transport.connect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_failure_halts_without_reading_sensors() {
    let transport = MockTransport::with_connect_failure();
    let sensors = MockSensor::fixed(Reading::new(23.5, 60.2, 512));
    let mut driver = mock_driver(MockNetworkLink::new(), transport.clone(), sensors.clone());

    let result = driver.run().await;

    assert!(matches!(result, Err(CycleError::BrokerHandshake(_))));
    assert!(matches!(driver.state(), DriverState::Halted(_)));
    assert_eq!(sensors.reads(), 0);
    assert!(transport.get_published_messages().await.is_empty());

    // Halted is terminal: no further handshake is attempted
    assert!(matches!(driver.run().await, Err(CycleError::Halted(_))));
    assert_eq!(transport.connect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hundred_cycles_publish_every_ten_seconds() {
    let transport = MockTransport::new();
    let mut driver = mock_driver(
        MockNetworkLink::new(),
        transport.clone(),
        MockSensor::fixed(Reading::new(23.5, 60.2, 512)),
    );
    let start = Instant::now();

    let stats = driver.run_for(100).await.unwrap();

    assert_eq!(stats.cycles, 100);
    assert_eq!(stats.delivered, 100);
    assert_eq!(stats.failed, 0);

    let messages = transport.get_published_messages().await;
    assert_eq!(messages.len(), 100);
    for (channel, payload) in &messages {
        assert_eq!(channel, "smartGarden/data");
        assert_eq!(
            payload.as_slice(),
            br#"{"temperature":23.50,"humidity":60.20,"soilMoisture":512}"#
        );
    }

    let times = transport.get_publish_times().await;
    assert_eq!(times[0], start);
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(10));
    }
    assert_eq!(start.elapsed(), Duration::from_secs(990));
}

#[tokio::test(start_paused = true)]
async fn test_first_publish_follows_network_retries() {
    let transport = MockTransport::new();
    let mut driver = mock_driver(
        MockNetworkLink::failing_times(3),
        transport.clone(),
        MockSensor::fixed(Reading::new(23.5, 60.2, 512)),
    );
    let start = Instant::now();

    driver.run_for(2).await.unwrap();

    let times = transport.get_publish_times().await;
    assert_eq!(times[0] - start, Duration::from_secs(15));
    assert_eq!(times[1] - start, Duration::from_secs(25));
}

#[tokio::test(start_paused = true)]
async fn test_publish_failures_do_not_stop_the_cycle() {
    let mut driver = mock_driver(
        MockNetworkLink::new(),
        MockTransport::with_publish_failure(),
        MockSensor::fixed(Reading::new(23.5, 60.2, 512)),
    );

    let stats = driver.run_for(5).await.unwrap();

    assert_eq!(stats.cycles, 5);
    assert_eq!(stats.failed, 5);
    assert_eq!(driver.state(), &DriverState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_readings_publish_sentinel_by_default() {
    let transport = MockTransport::new();
    let mut driver = mock_driver(
        MockNetworkLink::new(),
        transport.clone(),
        MockSensor::sequence(vec![
            Reading::new(21.0, 55.0, 300),
            Reading::from_parts(None, None, SoilMoisture::new(301)),
            Reading::new(21.5, 54.0, 302),
        ]),
    );

    let stats = driver.run_for(3).await.unwrap();

    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.invalid_readings, 1);

    let messages = transport.get_published_messages().await;
    let decoded = Payload::decode(&messages[1].1).unwrap();
    assert_eq!(decoded.temperature, None);
    assert_eq!(decoded.humidity, None);
    assert_eq!(decoded.soil_moisture.value(), 301);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_readings_skipped_by_policy() {
    let transport = MockTransport::new();
    let mut settings = CycleSettings::from_config(&test_config());
    settings.on_invalid_reading = InvalidReadingPolicy::Skip;
    let mut driver = CycleDriver::new(
        settings,
        MockNetworkLink::new(),
        transport.clone(),
        MockSensor::sequence(vec![
            Reading::new(21.0, 55.0, 300),
            Reading::from_parts(Some(21.2), None, SoilMoisture::new(301)),
            Reading::new(21.5, 54.0, 302),
        ]),
    );
    let start = Instant::now();

    let stats = driver.run_for(3).await.unwrap();

    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.skipped, 1);

    // Skipped cycles still wait out their period
    let times = transport.get_publish_times().await;
    assert_eq!(times[0] - start, Duration::ZERO);
    assert_eq!(times[1] - start, Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_last_reading_tracks_most_recent_cycle() {
    let mut driver = mock_driver(
        MockNetworkLink::new(),
        MockTransport::new(),
        MockSensor::sequence(vec![
            Reading::new(20.0, 50.0, 100),
            Reading::new(22.0, 52.0, 200),
        ]),
    );

    driver.run_for(2).await.unwrap();

    assert_eq!(driver.last_reading(), Some(&Reading::new(22.0, 52.0, 200)));
}

#[tokio::test]
async fn test_disconnect_closes_transport() {
    let transport = MockTransport::new();
    let mut driver = mock_driver(
        MockNetworkLink::new(),
        transport.clone(),
        MockSensor::fixed(Reading::new(20.0, 50.0, 100)),
    );
    driver.connect().await.unwrap();

    driver.disconnect().await.unwrap();

    assert!(!garden_telemetry::transport::Transport::is_connected(&transport));
}
