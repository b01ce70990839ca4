//! NetworkManager backend driven through the `nmcli` command line tool

use super::{NetworkError, NetworkLink};
use crate::error::sanitize_error_message;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Seconds nmcli itself waits for the association to complete
const NMCLI_WAIT_SECS: u64 = 15;
/// Grace period on top of nmcli's own wait before we give up on the process
const PROCESS_GRACE_SECS: u64 = 5;

/// Joins a WPA-PSK network with `nmcli device wifi connect`
#[derive(Clone)]
pub struct NmcliLink {
    ssid: String,
    passphrase: Option<String>,
    interface: Option<String>,
}

impl NmcliLink {
    pub fn new(ssid: String, passphrase: Option<String>, interface: Option<String>) -> Self {
        Self {
            ssid,
            passphrase,
            interface,
        }
    }

    /// Arguments passed to `nmcli`, passphrase included
    pub fn connect_args(&self) -> Vec<String> {
        let mut args = vec![
            "--wait".to_string(),
            NMCLI_WAIT_SECS.to_string(),
            "device".to_string(),
            "wifi".to_string(),
            "connect".to_string(),
            self.ssid.clone(),
        ];

        if let Some(passphrase) = &self.passphrase {
            args.push("password".to_string());
            args.push(passphrase.clone());
        }

        if let Some(interface) = &self.interface {
            args.push("ifname".to_string());
            args.push(interface.clone());
        }

        args
    }
}

impl fmt::Debug for NmcliLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NmcliLink")
            .field("ssid", &self.ssid)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .field("interface", &self.interface)
            .finish()
    }
}

#[async_trait]
impl NetworkLink for NmcliLink {
    async fn associate(&mut self) -> Result<(), NetworkError> {
        debug!(ssid = %self.ssid, interface = ?self.interface, "Running nmcli");

        let command = Command::new("nmcli")
            .args(self.connect_args())
            .kill_on_drop(true)
            .output();

        let limit = NMCLI_WAIT_SECS + PROCESS_GRACE_SECS;
        let output = tokio::time::timeout(Duration::from_secs(limit), command)
            .await
            .map_err(|_| NetworkError::Timeout(limit))?
            .map_err(NetworkError::CommandFailed)?;

        if output.status.success() {
            info!(ssid = %self.ssid, "Joined wireless network");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("nmcli exited with {}", output.status),
            text => sanitize_error_message(text),
        };

        Err(NetworkError::AssociationFailed {
            ssid: self.ssid.clone(),
            reason,
        })
    }

    fn describe(&self) -> String {
        self.ssid.clone()
    }
}
