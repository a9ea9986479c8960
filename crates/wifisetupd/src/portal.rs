//! Provisioning portal.
//!
//! Wraps the external `wifi-connect` binary, which raises a temporary access
//! point with a captive web UI and blocks until a client has supplied
//! credentials (or the process is killed). Afterwards connectivity is
//! re-checked; when the device is still offline the network stack is cycled.
//! Nothing in here is fatal to the service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use wifisetup_common::{CommandRunner, NetworkManager, SetupError};

/// Passphrase flag handed to the portal binary. Single dash.
pub const PASSPHRASE_FLAG: &str = "-portal-passphrase";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalOutcome {
    /// Credentials accepted and NetworkManager reports full connectivity
    Connected,
    /// Portal finished but the device is still offline
    Offline,
    /// The portal binary failed
    Error,
}

/// Progress notifications emitted while `run` is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalStage {
    /// Portal binary exited cleanly, connectivity is being re-checked
    Checking,
}

pub struct ProvisioningPortal {
    binary: PathBuf,
    runner: Arc<dyn CommandRunner>,
    network: NetworkManager,
}

impl ProvisioningPortal {
    /// The binary must exist now; a missing binary is a startup error.
    pub fn new(
        binary: PathBuf,
        runner: Arc<dyn CommandRunner>,
        network: NetworkManager,
    ) -> Result<Self, SetupError> {
        if !binary.is_file() {
            return Err(SetupError::PortalBinaryMissing(binary));
        }
        Ok(Self {
            binary,
            runner,
            network,
        })
    }

    /// Run the portal to completion. Blocks for as long as the user is
    /// interacting with it.
    pub fn run(
        &self,
        ssid: &str,
        password: Option<&str>,
        ui_dir: &Path,
        on_stage: &dyn Fn(PortalStage),
    ) -> PortalOutcome {
        self.network.ensure_radio_on();

        let args = portal_args(ssid, password, ui_dir);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let program = self.binary.to_string_lossy();

        info!("Starting provisioning portal (ssid={})", ssid);
        let result = self.runner.run(&program, &arg_refs);

        if !result.is_success() {
            error!("Provisioning portal failed: {}", result.summary());
            if !result.stdout.trim().is_empty() {
                warn!("Portal output: {}", result.stdout.trim());
            }
            self.recover();
            return PortalOutcome::Error;
        }

        info!("Provisioning portal exited after {}ms", result.duration_ms);
        on_stage(PortalStage::Checking);

        if self.network.has_full_connectivity() {
            info!("Device is online after provisioning");
            PortalOutcome::Connected
        } else {
            warn!("No internet after provisioning");
            self.recover();
            PortalOutcome::Offline
        }
    }

    fn recover(&self) {
        info!("Cycling networking to recover the network stack");
        if !self.network.cycle_networking() {
            warn!("Network recovery cycle did not complete cleanly");
        }
    }
}

/// Arguments for the portal binary.
pub fn portal_args(ssid: &str, password: Option<&str>, ui_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "--portal-ssid".to_string(),
        ssid.to_string(),
        "--ui-directory".to_string(),
        ui_dir.to_string_lossy().into_owned(),
    ];
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        args.push(PASSPHRASE_FLAG.to_string());
        args.push(password.to_string());
    }
    args
}
