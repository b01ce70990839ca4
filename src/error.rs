//! Crate-level error types for the garden telemetry node
//!
//! Each layer owns its own `thiserror` enum; `GardenError` aggregates them for
//! callers that drive the whole node (the binary and integration tests).

use crate::config::ConfigError;
use crate::cycle::CycleError;
use crate::transport::mqtt::MqttError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for garden telemetry operations
#[derive(Debug, Error)]
pub enum GardenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] MqttError),

    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for garden telemetry operations
pub type GardenResult<T> = Result<T, GardenError>;

const MAX_MESSAGE_LEN: usize = 500;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|passphrase|psk|token|key|secret)[=:]\s*\S+")
        .expect("secret pattern is a valid regex")
});

static SECRET_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|system-connections)/[a-zA-Z0-9._/-]+")
        .expect("secret path pattern is a valid regex")
});

/// Sanitize error text before it reaches the diagnostic log.
///
/// Output of external tools (nmcli, the broker) can echo credentials back;
/// those are redacted and the message is capped at 500 bytes.
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = SECRET_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Render an error together with its `source()` chain on one line.
pub fn describe_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut description = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }
    description
}
