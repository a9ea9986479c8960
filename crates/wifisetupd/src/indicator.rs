//! Indicator capability.
//!
//! The device shows WiFi status either on a small pixel display or on a
//! single LED. The choice is made once at startup; the two are never mixed.

use crate::led_cycler::LedCycler;
use anyhow::Result;
use std::net::Ipv4Addr;

/// Offline prompt shown when nothing better is known.
pub const OFFLINE_PROMPT: &str = "OFFLINE\nHold button to\nsetup WiFi";
pub const CHECKING_CONNECTIVITY: &str = "Checking\nconnectivity";
pub const NO_INTERNET: &str = "OFFLINE\nNo Internet";
pub const CONNECT_ERROR: &str = "OFFLINE\nConnect\nerror";

/// One frame of display content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub text: String,
    /// Signal strength percentage; draws the bar icon when present
    pub signal: Option<u8>,
}

impl StatusView {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            signal: None,
        }
    }

    pub fn online(ip: Option<Ipv4Addr>, signal: u8) -> Self {
        let ip = ip.map(|ip| ip.to_string()).unwrap_or_else(|| "No IP".to_string());
        Self {
            text: format!("ONLINE\n{}\nSignal: {}%", ip, signal),
            signal: Some(signal),
        }
    }

    pub fn portal_invitation(ssid: &str) -> Self {
        Self::message(format!("Connect to\n{}\nto setup wifi.", ssid))
    }
}

/// Which of the four signal bars are filled for a strength percentage.
pub fn signal_bars(strength: u8) -> [bool; 4] {
    let mut bars = [false; 4];
    for (i, bar) in bars.iter_mut().enumerate() {
        *bar = u32::from(strength) > (i as u32) * 25;
    }
    bars
}

/// A pixel display able to show a `StatusView` and be powered down.
pub trait Surface: Send {
    fn render(&mut self, view: &StatusView) -> Result<()>;
    fn set_power(&mut self, on: bool) -> Result<()>;
}

/// A single binary status output.
pub trait StatusLed: Send {
    fn set(&mut self, on: bool) -> Result<()>;
}

/// The indicator selected at startup.
pub enum Indicator {
    Display(Box<dyn Surface>),
    Led(LedCycler),
}

impl Indicator {
    pub fn is_display(&self) -> bool {
        matches!(self, Indicator::Display(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Indicator::Display(_) => "display",
            Indicator::Led(_) => "led",
        }
    }
}
