//! Service lifecycle.
//!
//! Brings the hardware up, wires the background threads to the orchestrator,
//! runs the poll loop until shutdown is requested, and tears everything down
//! in reverse order.

use crate::button::{ButtonMonitor, SAMPLE_PERIOD};
use crate::hardware::{open_display, CdevButton, CdevLed};
use crate::indicator::Indicator;
use crate::led_cycler::LedCycler;
use crate::orchestrator::{SetupOrchestrator, SystemClock};
use crate::override_watcher::OverrideWatcher;
use crate::portal::ProvisioningPortal;
use crate::preflight;
use anyhow::{Context, Result};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wifisetup_common::{CommandRunner, DeviceConfig, NetworkManager, SystemRunner, POLL_INTERVAL};

/// Logged when shutdown has to wait for a running portal.
pub const PORTAL_WAIT_WARNING: &str = "Waiting for the provisioning portal to exit. The portal \
     is not signalled, so this wait is unbounded until a client finishes setup";

pub struct WifiSetupService {
    orchestrator: Arc<SetupOrchestrator>,
    button: Option<ButtonMonitor>,
    watcher: Option<OverrideWatcher>,
    stopped: bool,
}

impl WifiSetupService {
    /// Run the startup checks and start every background unit.
    pub fn start(config: DeviceConfig) -> Result<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        let network = NetworkManager::new(Arc::clone(&runner), config.wireless_interface.clone());

        let portal_binary = preflight::check_environment(&config, &network)?;
        let portal = ProvisioningPortal::new(portal_binary, runner, network.clone())?;

        let indicator = match config.led_pin {
            Some(pin) => {
                let led = CdevLed::open(&config.gpio_chip, pin)?;
                let cycler = LedCycler::start(Box::new(led), config.led_interval())
                    .context("spawning LED thread")?;
                Indicator::Led(cycler)
            }
            None => Indicator::Display(open_display(&config)?),
        };
        info!("[BOOT] Indicator: {}", indicator.kind());

        let orchestrator = Arc::new(SetupOrchestrator::new(
            &config,
            indicator,
            network.clone(),
            portal,
            Arc::new(SystemClock),
        ));

        // Override messages only make sense on a display.
        let watcher = if config.uses_led() {
            None
        } else {
            Some(OverrideWatcher::start(&config.override_path, orchestrator.clone())?)
        };

        if network.ensure_radio_on() {
            info!("[BOOT] WiFi radio on ({})", network.interface());
        }

        let input = CdevButton::open(&config.gpio_chip, config.button_pin)?;
        let button = ButtonMonitor::start(
            Box::new(input),
            orchestrator.clone(),
            config.hold_duration(),
            SAMPLE_PERIOD,
        )
        .context("spawning button thread")?;

        Ok(Self {
            orchestrator,
            button: Some(button),
            watcher,
            stopped: false,
        })
    }

    /// Poll until `shutdown` fires or its sender is dropped, then stop.
    pub fn run(mut self, shutdown: Receiver<()>) -> Result<()> {
        info!("[READY] wifisetupd running");
        run_poll_loop(&self.orchestrator, &shutdown, POLL_INTERVAL);
        self.stop();
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!("Shutting down");
        if let Some(mut button) = self.button.take() {
            if self.orchestrator.is_provisioning() {
                warn!("{}", PORTAL_WAIT_WARNING);
            }
            button.stop();
        }
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        self.orchestrator.shutdown();
    }
}

impl Drop for WifiSetupService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick, then wait one period. Returns once shutdown is requested.
pub fn run_poll_loop(orchestrator: &SetupOrchestrator, shutdown: &Receiver<()>, period: Duration) {
    loop {
        orchestrator.tick();
        match shutdown.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
