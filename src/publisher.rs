//! Telemetry publisher
//!
//! Sends one encoded reading over an already-established broker session.
//! A failed publish is logged and reported, never retried: the next cycle
//! brings a fresher reading anyway.

use crate::error::describe_error_chain;
use crate::protocol::Payload;
use crate::transport::Transport;
use tracing::{info, warn};

/// Result of one publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    Failed,
}

impl PublishOutcome {
    pub fn is_delivered(self) -> bool {
        self == PublishOutcome::Delivered
    }
}

/// Publishes readings through a borrowed transport
pub struct TelemetryPublisher<'a, T> {
    transport: &'a T,
}

impl<'a, T: Transport> TelemetryPublisher<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn publish(&self, channel: &str, payload: &Payload) -> PublishOutcome {
        match self
            .transport
            .publish(channel, payload.as_bytes().to_vec())
            .await
        {
            Ok(()) => {
                info!("Data published: {}", payload);
                PublishOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    channel = %channel,
                    error = %describe_error_chain(&e),
                    "Failed to publish reading"
                );
                PublishOutcome::Failed
            }
        }
    }
}
