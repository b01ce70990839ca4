//! Impure I/O operations for the MQTT client
//!
//! The rumqttc event loop only makes progress while it is polled, and polling
//! is also what sends keep-alive pings. It runs in its own task for the
//! lifetime of the connection and reports through a `watch` channel; the
//! cycle never touches it directly.

use super::connection::{
    configure_mqtt_options, ConnectionState, MqttError, RECONNECT_DELAY, TELEMETRY_QOS,
    TELEMETRY_RETAIN,
};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::MqttSection;
use crate::transport::Transport;
use async_trait::async_trait;
use rumqttc::v5::{AsyncClient, EventLoop};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the request queue between client handle and event loop
const REQUEST_CAPACITY: usize = 10;

/// MQTT transport for garden telemetry
pub struct MqttClient {
    device_id: String,
    client: AsyncClient,
    /// Moved into the polling task on connect; the mutex keeps the client `Sync`
    event_loop: Mutex<Option<EventLoop>>,
    config: MqttSection,
    event_loop_handle: Option<JoinHandle<()>>,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl MqttClient {
    pub fn new(device_id: &str, config: MqttSection) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(device_id, &config)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

        Ok(MqttClient {
            device_id: device_id.to_string(),
            client,
            event_loop: Mutex::new(Some(event_loop)),
            config,
            event_loop_handle: None,
            state_rx: None,
            shutdown_tx: None,
        })
    }

    /// Create connection state and shutdown channels
    #[allow(clippy::type_complexity)]
    fn setup_connection_channels() -> (
        (
            watch::Sender<ConnectionState>,
            watch::Receiver<ConnectionState>,
        ),
        (watch::Sender<bool>, watch::Receiver<bool>),
    ) {
        let state_channels = watch::channel(ConnectionState::Connecting);
        let shutdown_channels = watch::channel(false);
        (state_channels, shutdown_channels)
    }

    /// Wait for connection confirmation (ConnAck) with timeout
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::HandshakeFailed(
                        "State channel closed".to_string(),
                    ));
                }
                match *state_rx.borrow() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected(ref reason) => {
                        return Err(MqttError::HandshakeFailed(reason.clone()));
                    }
                    ConnectionState::Connecting => continue,
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(MqttError::HandshakeFailed(
                "ConnAck timeout - no connection confirmation received".to_string(),
            )),
        }
    }

    /// Open the broker session.
    ///
    /// Returns only once the broker has acknowledged the connection. A refused
    /// or unanswered handshake is reported as [`MqttError::HandshakeFailed`]
    /// and the event loop is stopped.
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        let event_loop = self
            .event_loop
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or_else(|| MqttError::HandshakeFailed("Event loop already started".to_string()))?;

        let ((state_tx, state_rx), (shutdown_tx, shutdown_rx)) =
            Self::setup_connection_channels();
        self.state_rx = Some(state_rx.clone());
        self.shutdown_tx = Some(shutdown_tx);

        info!(
            device_id = %self.device_id,
            broker = %self.config.broker_url,
            "Connecting to MQTT broker"
        );

        let device_id = self.device_id.clone();
        let handle = tokio::spawn(async move {
            Self::run_event_loop(event_loop, state_tx, shutdown_rx).await;
            debug!(device_id = %device_id, "MQTT event loop stopped");
        });
        self.event_loop_handle = Some(handle);

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        if let Err(e) = Self::wait_for_connection_confirmation(state_rx, timeout).await {
            self.stop_event_loop();
            return Err(e);
        }

        info!(broker = %self.config.broker_url, "Connected to MQTT broker");
        Ok(())
    }

    /// Poll the event loop until shutdown.
    ///
    /// An error before the first ConnAck ends the loop, which fails the
    /// handshake. After that, errors mark the connection down and the next poll
    /// reconnects.
    async fn run_event_loop(
        mut event_loop: EventLoop,
        state_tx: watch::Sender<ConnectionState>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut handshake_done = false;

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                event_result = event_loop.poll() => {
                    match event_result {
                        Ok(event) => match MessageHandler::route_mqtt_event(&event) {
                            EventRoute::ConnectionAcknowledged => {
                                if handshake_done {
                                    info!("Reconnected to MQTT broker");
                                }
                                handshake_done = true;
                                let _ = state_tx.send(ConnectionState::Connected);
                            }
                            EventRoute::Disconnected => {
                                warn!("MQTT broker closed the connection");
                                let _ = state_tx.send(ConnectionState::Disconnected(
                                    "Broker sent DISCONNECT".to_string(),
                                ));
                            }
                            EventRoute::KeepAlive => {
                                debug!(target: "mqtt_transport", "Keep-alive acknowledged");
                            }
                            EventRoute::InfrastructureEvent(event) => {
                                debug!(target: "mqtt_transport", "MQTT event: {}", event);
                            }
                            EventRoute::OutgoingEvent => {}
                        },
                        Err(e) => {
                            let reason = e.to_string();
                            let _ = state_tx.send(ConnectionState::Disconnected(reason.clone()));

                            if !handshake_done {
                                error!(error = %reason, "MQTT handshake failed");
                                break;
                            }

                            warn!(error = %reason, "MQTT connection lost, reconnecting");
                            if !Self::interruptible_sleep(shutdown_rx.clone(), RECONNECT_DELAY).await {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Perform interruptible sleep with shutdown monitoring
    /// Returns true if sleep completed, false if shutdown requested
    async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay: Duration) -> bool {
        tokio::select! {
            changed = shutdown_rx.changed() => changed.is_ok() && !*shutdown_rx.borrow(),
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn stop_event_loop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }

    /// Close the broker session and stop the event loop
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        let was_connected = self.is_connected();

        if was_connected {
            self.client
                .disconnect()
                .await
                .map_err(|e| MqttError::ConnectionFailed(Box::new(e)))?;
        }

        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        if let Some(handle) = self.event_loop_handle.take() {
            match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(())) => debug!("Event loop task shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => warn!("Event loop task ended with error: {}", e),
                Err(_) => warn!("Event loop task didn't shut down gracefully, forcing abort"),
                _ => {}
            }
        }

        if was_connected {
            info!("MQTT client disconnected");
        }
        Ok(())
    }

    /// Get current connection state
    /// Returns None if connection hasn't been established yet
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.state_rx.as_ref().map(|rx| rx.borrow().clone())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection_state(), Some(ConnectionState::Connected))
    }

    /// Check connection state before operations
    fn check_connection_state(&self) -> Result<(), MqttError> {
        let state = self
            .connection_state()
            .unwrap_or(ConnectionState::Disconnected("Never connected".to_string()));

        if !state.can_publish() {
            return Err(MqttError::NotConnected { state });
        }

        Ok(())
    }

    /// Queue one message for the event loop.
    ///
    /// Uses the non-blocking request path: when the queue is full the message
    /// is rejected rather than buffered behind stale readings.
    pub fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), MqttError> {
        self.check_connection_state()?;

        self.client
            .try_publish(channel, TELEMETRY_QOS, TELEMETRY_RETAIN, payload)
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        MqttClient::connect(self).await
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        MqttClient::disconnect(self).await
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        MqttClient::publish(self, channel, payload)
    }

    fn is_connected(&self) -> bool {
        MqttClient::is_connected(self)
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        MqttClient::connection_state(self)
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Drop cannot await a DISCONNECT; this only stops the background task
        self.stop_event_loop();
    }
}
