//! Setup orchestrator.
//!
//! Single authority over what the indicator shows and whether provisioning
//! is running. Button callbacks, the override watcher and the poll loop all
//! come through here; every render and every change to the screen power
//! state happens under one lock.
//!
//! The lock is not held while the portal binary runs. A `provisioning` flag
//! set under the lock keeps the poll loop from drawing over the portal
//! screen, powering it down, or starting a second portal.

use crate::button::ButtonHandler;
use crate::indicator::{
    Indicator, StatusView, CHECKING_CONNECTIVITY, CONNECT_ERROR, NO_INTERNET, OFFLINE_PROMPT,
};
use crate::override_watcher::{read_override_message, OverrideSink};
use crate::portal::{PortalOutcome, PortalStage, ProvisioningPortal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wifisetup_common::{DeviceConfig, NetworkManager, WifiState};

/// Time source, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct OrchestratorState {
    last_activity: Instant,
    screen_on: bool,
    provisioning: bool,
    wifi_state: WifiState,
    indicator: Indicator,
}

pub struct SetupOrchestrator {
    portal_ssid: String,
    portal_password: Option<String>,
    ui_dir: PathBuf,
    override_path: PathBuf,
    idle_timeout: Option<Duration>,
    network: NetworkManager,
    portal: ProvisioningPortal,
    clock: Arc<dyn Clock>,
    state: Mutex<OrchestratorState>,
}

impl SetupOrchestrator {
    pub fn new(
        config: &DeviceConfig,
        indicator: Indicator,
        network: NetworkManager,
        portal: ProvisioningPortal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = OrchestratorState {
            last_activity: clock.now(),
            screen_on: true,
            provisioning: false,
            wifi_state: WifiState::Disconnected,
            indicator,
        };

        Self {
            portal_ssid: config.portal_ssid.clone(),
            portal_password: config.portal_password.clone(),
            ui_dir: config.ui_dir(),
            override_path: config.override_path.clone(),
            idle_timeout: config.idle_timeout(),
            network,
            portal,
            clock,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Short press: wake the screen, restart the idle timer, redraw.
    pub fn on_button_pressed(&self) {
        debug!("Button press");
        self.wake();
    }

    /// The override file changed: same as a press, without the button.
    pub fn on_override_event(&self) {
        debug!("Override file changed");
        self.wake();
    }

    fn wake(&self) {
        let mut state = self.lock();
        self.mark_activity(&mut state);
        self.render_current(&mut state);
    }

    /// Long press: open the provisioning portal and report the outcome.
    ///
    /// Blocks the calling thread until the portal binary exits.
    pub fn on_button_held(&self) {
        {
            let mut state = self.lock();
            if state.provisioning {
                info!("Provisioning already in progress, ignoring hold");
                return;
            }
            state.provisioning = true;
            self.mark_activity(&mut state);
            state.wifi_state = WifiState::Configuring;
            if let Indicator::Led(led) = &state.indicator {
                led.configuring();
            }
            self.show(&mut state, &StatusView::portal_invitation(&self.portal_ssid));
        }

        let on_stage = |stage: PortalStage| match stage {
            PortalStage::Checking => {
                let mut state = self.lock();
                self.show(&mut state, &StatusView::message(CHECKING_CONNECTIVITY));
            }
        };
        let outcome = self.portal.run(
            &self.portal_ssid,
            self.portal_password.as_deref(),
            &self.ui_dir,
            &on_stage,
        );
        info!("Provisioning finished: {:?}", outcome);

        let mut state = self.lock();
        state.provisioning = false;
        self.mark_activity(&mut state);
        self.show_outcome(&mut state, outcome);
    }

    /// One poll period elapsed.
    pub fn tick(&self) {
        let mut state = self.lock();
        if state.provisioning {
            debug!("Tick skipped while provisioning");
            return;
        }

        if !state.indicator.is_display() {
            let connected = self.network.has_full_connectivity();
            self.set_led_connectivity(&mut state, connected);
            return;
        }

        let now = self.clock.now();
        if self.idle_expired(&state, now) {
            self.set_screen_power(&mut state, false);
        } else if state.screen_on {
            self.render_current(&mut state);
        }
    }

    pub fn screen_on(&self) -> bool {
        self.lock().screen_on
    }

    pub fn wifi_state(&self) -> WifiState {
        self.lock().wifi_state
    }

    pub fn is_provisioning(&self) -> bool {
        self.lock().provisioning
    }

    /// Stop the LED thread, if any, leaving the LED off.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if let Indicator::Led(led) = &mut state.indicator {
            led.stop();
        }
    }

    fn idle_expired(&self, state: &OrchestratorState, now: Instant) -> bool {
        match self.idle_timeout {
            Some(timeout) => now.saturating_duration_since(state.last_activity) > timeout,
            None => false,
        }
    }

    fn mark_activity(&self, state: &mut OrchestratorState) {
        let now = self.clock.now();
        if now > state.last_activity {
            state.last_activity = now;
        }
        self.set_screen_power(state, true);
    }

    fn set_screen_power(&self, state: &mut OrchestratorState, on: bool) {
        if state.screen_on == on {
            return;
        }
        if let Indicator::Display(surface) = &mut state.indicator {
            match surface.set_power(on) {
                Ok(()) => {
                    state.screen_on = on;
                    info!("Screen {}", if on { "on" } else { "off" });
                }
                Err(e) => warn!("Failed to switch screen {}: {:#}", if on { "on" } else { "off" }, e),
            }
        }
    }

    /// Compute and draw the current status. Override message beats live
    /// connectivity, which beats the offline prompt.
    fn render_current(&self, state: &mut OrchestratorState) {
        if state.provisioning || !state.indicator.is_display() || !state.screen_on {
            return;
        }

        let view = if let Some(message) = read_override_message(&self.override_path) {
            StatusView::message(message)
        } else if self.network.has_full_connectivity() {
            state.wifi_state = WifiState::Connected;
            self.online_view()
        } else {
            state.wifi_state = WifiState::Disconnected;
            StatusView::message(OFFLINE_PROMPT)
        };
        self.show(state, &view);
    }

    fn show_outcome(&self, state: &mut OrchestratorState, outcome: PortalOutcome) {
        let connected = outcome == PortalOutcome::Connected;
        if !state.indicator.is_display() {
            self.set_led_connectivity(state, connected);
            return;
        }

        state.wifi_state = if connected {
            WifiState::Connected
        } else {
            WifiState::Disconnected
        };
        let view = match outcome {
            PortalOutcome::Connected => self.online_view(),
            PortalOutcome::Offline => StatusView::message(NO_INTERNET),
            PortalOutcome::Error => StatusView::message(CONNECT_ERROR),
        };
        self.show(state, &view);
    }

    fn set_led_connectivity(&self, state: &mut OrchestratorState, connected: bool) {
        state.wifi_state = if connected {
            WifiState::Connected
        } else {
            WifiState::Disconnected
        };
        if let Indicator::Led(led) = &state.indicator {
            led.set_state(state.wifi_state);
        }
    }

    fn online_view(&self) -> StatusView {
        StatusView::online(self.network.wifi_ipv4(), self.network.signal_strength())
    }

    fn show(&self, state: &mut OrchestratorState, view: &StatusView) {
        if let Indicator::Display(surface) = &mut state.indicator {
            if let Err(e) = surface.render(view) {
                warn!("Display update failed: {:#}", e);
            }
        }
    }
}

impl ButtonHandler for SetupOrchestrator {
    fn on_pressed(&self) {
        self.on_button_pressed();
    }

    fn on_held(&self) {
        self.on_button_held();
    }
}

impl OverrideSink for SetupOrchestrator {
    fn on_override_event(&self) {
        SetupOrchestrator::on_override_event(self);
    }
}
