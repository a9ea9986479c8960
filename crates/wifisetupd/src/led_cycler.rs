//! LED blink thread.
//!
//! Approximates three WiFi states on a single LED: on when connected,
//! blinking while configuring, off when disconnected. The state is a plain
//! atomic written by the orchestrator and read by the blink thread; being a
//! tick late is harmless.

use crate::indicator::StatusLed;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use wifisetup_common::WifiState;

struct Shared {
    state: AtomicU8,
    running: AtomicBool,
}

pub struct LedCycler {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl LedCycler {
    /// Spawn the blink thread. The LED starts in the disconnected (off) state.
    pub fn start(mut led: Box<dyn StatusLed>, interval: Duration) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(encode(WifiState::Disconnected)),
            running: AtomicBool::new(true),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("led-cycler".to_string())
            .spawn(move || {
                let mut lit = false;
                let mut write_failed = false;
                while thread_shared.running.load(Ordering::SeqCst) {
                    let state = decode(thread_shared.state.load(Ordering::SeqCst));
                    lit = next_output(state, lit);
                    match led.set(lit) {
                        Ok(()) => write_failed = false,
                        Err(e) if !write_failed => {
                            warn!("LED write failed: {:#}", e);
                            write_failed = true;
                        }
                        Err(_) => {}
                    }
                    thread::sleep(interval);
                }
                if let Err(e) = led.set(false) {
                    warn!("Failed to switch LED off on shutdown: {:#}", e);
                }
                debug!("LED cycler exited");
            })?;

        info!("LED cycler started ({}ms interval)", interval.as_millis());
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    pub fn connected(&self) {
        self.set_state(WifiState::Connected);
    }

    pub fn configuring(&self) {
        self.set_state(WifiState::Configuring);
    }

    pub fn disconnected(&self) {
        self.set_state(WifiState::Disconnected);
    }

    pub fn set_state(&self, state: WifiState) {
        self.shared.state.store(encode(state), Ordering::SeqCst);
    }

    /// Signal the thread, wait for it, and leave the LED off. Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("LED cycler thread panicked");
            }
            info!("LED cycler stopped");
        }
    }
}

impl Drop for LedCycler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// LED level for the next tick given the current state and level.
pub fn next_output(state: WifiState, lit: bool) -> bool {
    match state {
        WifiState::Connected => true,
        WifiState::Configuring => !lit,
        WifiState::Disconnected => false,
    }
}

fn encode(state: WifiState) -> u8 {
    match state {
        WifiState::Connected => 1,
        WifiState::Configuring => 2,
        WifiState::Disconnected => 3,
    }
}

fn decode(raw: u8) -> WifiState {
    match raw {
        1 => WifiState::Connected,
        2 => WifiState::Configuring,
        _ => WifiState::Disconnected,
    }
}
