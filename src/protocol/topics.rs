//! Channel name and device ID validation
//!
//! Readings go to a single publish channel, so wildcard filters and other
//! subscription-only syntax are rejected up front.

use thiserror::Error;

/// MQTT limits topic names to a 16-bit length prefix
pub const MAX_CHANNEL_LEN: usize = u16::MAX as usize;

pub fn validate_channel(channel: &str) -> Result<(), ValidationError> {
    if channel.is_empty() {
        return Err(ValidationError::EmptyChannel);
    }

    if channel.len() > MAX_CHANNEL_LEN {
        return Err(ValidationError::ChannelTooLong(channel.len()));
    }

    if let Some(ch) = channel.chars().find(|c| matches!(c, '+' | '#' | '\0')) {
        return Err(ValidationError::InvalidChannelChar(ch));
    }

    Ok(())
}

pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    if device_id.is_empty() {
        return Err(ValidationError::EmptyDeviceId);
    }

    for ch in device_id.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '.' && ch != '_' && ch != '-' {
            return Err(ValidationError::InvalidDeviceIdChar(ch));
        }
    }

    Ok(())
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Channel cannot be empty")]
    EmptyChannel,
    #[error("Channel is {0} bytes, longer than the MQTT limit")]
    ChannelTooLong(usize),
    #[error("Channel contains a character not allowed in a publish topic: {0:?}")]
    InvalidChannelChar(char),
    #[error("Device ID cannot be empty")]
    EmptyDeviceId,
    #[error("Device ID contains invalid character: '{0}'")]
    InvalidDeviceIdChar(char),
}
