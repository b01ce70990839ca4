//! Cycle driver with dependency injection
//!
//! The network link, broker transport and sensors are injected so the whole
//! lifecycle runs against mocks in tests.

use super::{CycleError, CycleOutcome, CycleSchedule, CycleSettings, CycleStats, DriverState};
use crate::config::InvalidReadingPolicy;
use crate::error::describe_error_chain;
use crate::network::NetworkLink;
use crate::protocol::Payload;
use crate::publisher::{PublishOutcome, TelemetryPublisher};
use crate::sensor::{Reading, SensorReader};
use crate::transport::Transport;
use crate::{cycle_span, mqtt_span, network_span};
use std::convert::Infallible;
use tracing::{debug, error, info, warn, Instrument};

pub struct CycleDriver<N, T, S> {
    settings: CycleSettings,
    link: N,
    transport: T,
    sensors: S,
    state: DriverState,
    stats: CycleStats,
    last_reading: Option<Reading>,
}

impl<N, T, S> CycleDriver<N, T, S>
where
    N: NetworkLink,
    T: Transport,
    S: SensorReader,
{
    pub fn new(settings: CycleSettings, link: N, transport: T, sensors: S) -> Self {
        Self {
            settings,
            link,
            transport,
            sensors,
            state: DriverState::Connecting,
            stats: CycleStats::default(),
            last_reading: None,
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Reading taken by the most recent cycle, replaced every cycle
    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Join the network, then open the broker session.
    ///
    /// Network association is retried every `retry_delay` until it succeeds.
    /// A failed broker handshake halts the driver for good.
    pub async fn connect(&mut self) -> Result<(), CycleError> {
        match &self.state {
            DriverState::Running => return Ok(()),
            DriverState::Halted(reason) => return Err(CycleError::Halted(reason.clone())),
            DriverState::Connecting => {}
        }

        let network = self.link.describe();
        self.associate_network()
            .instrument(network_span!(network = %network))
            .await;

        let channel = self.settings.channel.clone();
        let handshake = self
            .transport
            .connect()
            .instrument(mqtt_span!(operation = "connect", channel = %channel))
            .await;

        match handshake {
            Ok(()) => {
                info!(channel = %self.settings.channel, "Broker connected, starting sensor cycle");
                self.state = DriverState::Running;
                Ok(())
            }
            Err(e) => {
                let reason = describe_error_chain(&e);
                error!(error = %reason, "Broker handshake failed, halting");
                self.state = DriverState::Halted(reason.clone());
                Err(CycleError::BrokerHandshake(reason))
            }
        }
    }

    async fn associate_network(&mut self) {
        let mut attempt: u32 = 0;
        info!(network = %self.link.describe(), "Connecting to network");

        loop {
            attempt += 1;
            match self.link.associate().await {
                Ok(()) => {
                    info!(attempt, "Network connected");
                    return;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        retry_in_secs = self.settings.retry_delay.as_secs_f64(),
                        error = %describe_error_chain(&e),
                        "Network association failed, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
            }
        }
    }

    /// Run one read, encode, publish step.
    ///
    /// Only valid once the driver is running.
    pub async fn run_once(&mut self) -> Result<CycleOutcome, CycleError> {
        match &self.state {
            DriverState::Running => {}
            DriverState::Halted(reason) => return Err(CycleError::Halted(reason.clone())),
            DriverState::Connecting => return Err(CycleError::NotRunning),
        }

        let reading = self.sensors.read().await;
        self.stats.cycles += 1;
        self.last_reading = Some(reading);

        if !reading.is_complete() {
            self.stats.invalid_readings += 1;
            if self.settings.on_invalid_reading == InvalidReadingPolicy::Skip {
                warn!("Climate sensor returned no reading, skipping publish");
                self.stats.skipped += 1;
                self.log_stats();
                return Ok(CycleOutcome::Skipped);
            }
            warn!("Climate sensor returned no reading, publishing placeholder values");
        }

        let payload = Payload::encode(&reading);
        let outcome = TelemetryPublisher::new(&self.transport)
            .publish(&self.settings.channel, &payload)
            .await;

        match outcome {
            PublishOutcome::Delivered => self.stats.delivered += 1,
            PublishOutcome::Failed => self.stats.failed += 1,
        }
        self.log_stats();

        Ok(CycleOutcome::Published(outcome))
    }

    fn log_stats(&self) {
        debug!(
            cycles = self.stats.cycles,
            delivered = self.stats.delivered,
            failed = self.stats.failed,
            skipped = self.stats.skipped,
            invalid_readings = self.stats.invalid_readings,
            "Cycle complete"
        );
    }

    /// Connect if needed, then run exactly `cycles` cycles on the schedule
    pub async fn run_for(&mut self, cycles: u64) -> Result<CycleStats, CycleError> {
        self.connect().await?;

        let mut schedule = CycleSchedule::new(self.settings.interval);
        for _ in 0..cycles {
            schedule.tick().await;
            self.step().await?;
        }

        Ok(self.stats)
    }

    /// Connect if needed, then cycle forever.
    ///
    /// Returns only when the broker handshake fails.
    pub async fn run(&mut self) -> Result<Infallible, CycleError> {
        self.connect().await?;

        let mut schedule = CycleSchedule::new(self.settings.interval);
        loop {
            schedule.tick().await;
            self.step().await?;
        }
    }

    async fn step(&mut self) -> Result<CycleOutcome, CycleError> {
        let cycle = self.stats.cycles + 1;
        self.run_once().instrument(cycle_span!(cycle)).await
    }

    /// Close the broker session; for process shutdown
    pub async fn disconnect(&mut self) -> Result<(), T::Error> {
        self.transport.disconnect().await
    }
}
