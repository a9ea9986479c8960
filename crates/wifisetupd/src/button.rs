//! Setup button edge and hold detection.
//!
//! The button line is sampled on a fixed period. A press edge reports
//! `on_pressed`; a press that stays down for the hold threshold reports
//! `on_held` exactly once. The held callback runs on the sampling thread and
//! may block for as long as the provisioning portal is open.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Button sampling period
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(20);

/// Something that can report whether the button is currently down.
pub trait ButtonInput: Send {
    fn is_pressed(&mut self) -> Result<bool>;
}

/// Receives button events.
pub trait ButtonHandler: Send + Sync {
    fn on_pressed(&self);
    fn on_held(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Held,
    Released,
}

/// Turns a stream of level samples into press/hold/release events.
#[derive(Debug)]
pub struct HoldDetector {
    hold: Duration,
    pressed_at: Option<Instant>,
    held_fired: bool,
}

impl HoldDetector {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            pressed_at: None,
            held_fired: false,
        }
    }

    pub fn update(&mut self, pressed: bool, now: Instant) -> Option<ButtonEvent> {
        match (self.pressed_at, pressed) {
            (None, true) => {
                self.pressed_at = Some(now);
                self.held_fired = false;
                Some(ButtonEvent::Pressed)
            }
            (Some(since), true) => {
                if !self.held_fired && now.saturating_duration_since(since) >= self.hold {
                    self.held_fired = true;
                    Some(ButtonEvent::Held)
                } else {
                    None
                }
            }
            (Some(_), false) => {
                self.pressed_at = None;
                Some(ButtonEvent::Released)
            }
            (None, false) => None,
        }
    }
}

pub struct ButtonMonitor {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ButtonMonitor {
    pub fn start(
        mut input: Box<dyn ButtonInput>,
        handler: Arc<dyn ButtonHandler>,
        hold: Duration,
        period: Duration,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("button".to_string())
            .spawn(move || {
                let mut detector = HoldDetector::new(hold);
                let mut read_failed = false;
                while thread_running.load(Ordering::SeqCst) {
                    let pressed = match input.is_pressed() {
                        Ok(pressed) => {
                            read_failed = false;
                            pressed
                        }
                        Err(e) => {
                            if !read_failed {
                                warn!("Button read failed: {:#}", e);
                                read_failed = true;
                            }
                            false
                        }
                    };

                    match detector.update(pressed, Instant::now()) {
                        Some(ButtonEvent::Pressed) => {
                            debug!("Button pressed");
                            handler.on_pressed();
                        }
                        Some(ButtonEvent::Held) => {
                            info!("Button held for {}s", hold.as_secs());
                            handler.on_held();
                        }
                        Some(ButtonEvent::Released) => debug!("Button released"),
                        None => {}
                    }
                    thread::sleep(period);
                }
            })?;

        info!("Button monitor started (hold {}s)", hold.as_secs());
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Signal the sampling thread and join it.
    ///
    /// Blocks while a held callback is still running.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Button thread panicked");
            }
        }
    }
}

impl Drop for ButtonMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
