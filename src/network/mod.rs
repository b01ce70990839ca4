//! Wireless network association
//!
//! A [`NetworkLink`] makes one attempt to join the configured network. The
//! cycle driver owns retrying; a link never sleeps or loops on its own.

use crate::config::{GardenConfig, NetworkBackend};
use async_trait::async_trait;
use thiserror::Error;

pub mod nmcli;

pub use nmcli::NmcliLink;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to join network '{ssid}': {reason}")]
    AssociationFailed { ssid: String, reason: String },
    #[error("Failed to run network command")]
    CommandFailed(#[source] std::io::Error),
    #[error("Network association timed out after {0}s")]
    Timeout(u64),
}

/// One attempt at bringing the node onto its network
#[async_trait]
pub trait NetworkLink: Send {
    async fn associate(&mut self) -> Result<(), NetworkError>;

    /// Short human-readable name of the target network for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<L: NetworkLink + ?Sized> NetworkLink for Box<L> {
    async fn associate(&mut self) -> Result<(), NetworkError> {
        (**self).associate().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Link for hosts whose network is brought up by the OS before we start
#[derive(Debug, Clone, Default)]
pub struct PresetLink;

#[async_trait]
impl NetworkLink for PresetLink {
    async fn associate(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "preconfigured network".to_string()
    }
}

/// Build the link selected in configuration, resolving the passphrase from the environment
pub fn build_network_link(
    config: &GardenConfig,
) -> Result<Box<dyn NetworkLink>, crate::config::ConfigError> {
    match config.network.backend {
        NetworkBackend::Preset => Ok(Box::new(PresetLink)),
        NetworkBackend::Nmcli => {
            let passphrase = config.get_network_passphrase()?;
            Ok(Box::new(NmcliLink::new(
                config.network.ssid.clone(),
                passphrase,
                config.network.interface.clone(),
            )))
        }
    }
}
