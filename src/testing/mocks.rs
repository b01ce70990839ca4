//! Mock implementations for testing
//!
//! Provides mock Transport, NetworkLink and SensorReader implementations so the
//! full cycle runs without a broker, a Wi-Fi radio or sensors attached.
//! Every mock is `Clone` and shares its recorders between clones: keep one
//! handle in the test and move the other into the driver.

use crate::network::{NetworkError, NetworkLink};
use crate::sensor::{Reading, SensorReader};
use crate::transport::mqtt::{ConnectionState, MqttError};
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub type PublishedMessage = (String, Vec<u8>);

/// Mock transport for testing
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    pub published_messages: Arc<Mutex<Vec<PublishedMessage>>>,
    pub publish_times: Arc<Mutex<Vec<Instant>>>,
    pub fail_connect: bool,
    pub fail_publish: bool,
    connected: Arc<AtomicBool>,
    connect_attempts: Arc<AtomicU32>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker that never acknowledges the handshake
    pub fn with_connect_failure() -> Self {
        Self {
            fail_connect: true,
            ..Default::default()
        }
    }

    /// Broker that accepts the session but drops every publish
    pub fn with_publish_failure() -> Self {
        Self {
            fail_publish: true,
            ..Default::default()
        }
    }

    pub async fn get_published_messages(&self) -> Vec<PublishedMessage> {
        self.published_messages.lock().await.clone()
    }

    /// Instants (tokio clock) at which each publish happened
    pub async fn get_publish_times(&self) -> Vec<Instant> {
        self.publish_times.lock().await.clone()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub async fn clear_history(&self) {
        self.published_messages.lock().await.clear();
        self.publish_times.lock().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_connect {
            return Err(MqttError::HandshakeFailed(
                "Mock broker refused connection".to_string(),
            ));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        if self.fail_publish {
            return Err(MqttError::PublishFailed("Mock publish failure".into()));
        }

        if !self.is_connected() {
            return Err(MqttError::NotConnected {
                state: ConnectionState::Disconnected("Mock transport not connected".to_string()),
            });
        }

        self.publish_times.lock().await.push(Instant::now());
        self.published_messages
            .lock()
            .await
            .push((channel.to_string(), payload));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        if self.connect_attempts() == 0 {
            None
        } else if self.is_connected() {
            Some(ConnectionState::Connected)
        } else {
            Some(ConnectionState::Disconnected("Mock disconnected".to_string()))
        }
    }
}

/// Mock network link that fails a set number of times before associating
#[derive(Debug, Default, Clone)]
pub struct MockNetworkLink {
    failures_remaining: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
    attempt_times: Arc<Mutex<Vec<Instant>>>,
}

impl MockNetworkLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_times(failures: u32) -> Self {
        Self {
            failures_remaining: Arc::new(AtomicU32::new(failures)),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn get_attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().await.clone()
    }
}

#[async_trait]
impl NetworkLink for MockNetworkLink {
    async fn associate(&mut self) -> Result<(), NetworkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempt_times.lock().await.push(Instant::now());

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();

        if failed {
            Err(NetworkError::AssociationFailed {
                ssid: "MockNet".to_string(),
                reason: format!("mock failure on attempt {attempt}"),
            })
        } else {
            Ok(())
        }
    }

    fn describe(&self) -> String {
        "MockNet".to_string()
    }
}

/// Mock sensor returning scripted readings; the last one repeats forever
#[derive(Debug, Clone)]
pub struct MockSensor {
    readings: Arc<Vec<Reading>>,
    reads: Arc<AtomicU32>,
}

impl MockSensor {
    pub fn fixed(reading: Reading) -> Self {
        Self::sequence(vec![reading])
    }

    /// An empty script reads as an all-absent reading
    pub fn sequence(mut readings: Vec<Reading>) -> Self {
        if readings.is_empty() {
            readings.push(Reading::default());
        }
        Self {
            readings: Arc::new(readings),
            reads: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorReader for MockSensor {
    async fn read(&mut self) -> Reading {
        let index = self.reads.fetch_add(1, Ordering::SeqCst) as usize;
        let last = self.readings.len() - 1;
        self.readings[index.min(last)]
    }
}
