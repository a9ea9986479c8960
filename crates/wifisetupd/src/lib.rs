//! wifisetupd - WiFi provisioning daemon for headless devices.
//!
//! A button, a small OLED display or a single LED, and a captive portal:
//! hold the button to open the portal, read connectivity status off the
//! indicator the rest of the time.

pub mod button;
pub mod hardware;
pub mod indicator;
pub mod led_cycler;
pub mod orchestrator;
pub mod override_watcher;
pub mod portal;
pub mod preflight;
pub mod service;
