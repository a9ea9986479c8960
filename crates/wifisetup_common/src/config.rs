//! Device configuration.
//!
//! Loaded once at startup from /etc/wifisetup/config.toml (or an explicit
//! path), then overridden by command line flags. Never mutated afterwards.

use crate::error::SetupError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/wifisetup/config.toml";

/// A press must be held this long before it opens the portal.
pub const HOLD_DURATION: Duration = Duration::from_secs(5);

/// Period of the main status poll loop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Pause between `networking off` and `networking on` during recovery.
pub const RECOVERY_SETTLE: Duration = Duration::from_secs(1);

/// Everything the service needs to know about the device it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// GPIO line the setup button is wired to
    #[serde(default = "default_button_pin")]
    pub button_pin: u32,

    /// GPIO line driving a status LED. When set, the LED replaces the display.
    #[serde(default)]
    pub led_pin: Option<u32>,

    /// GPIO character device holding the button/LED lines
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: PathBuf,

    /// I2C bus the display hangs off
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: PathBuf,

    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    #[serde(default = "default_display_width")]
    pub display_width: u32,

    #[serde(default = "default_display_height")]
    pub display_height: u32,

    /// SSID advertised by the provisioning portal
    #[serde(default = "default_portal_ssid")]
    pub portal_ssid: String,

    /// Optional WPA passphrase for the portal network
    #[serde(default)]
    pub portal_password: Option<String>,

    /// Seconds of inactivity before the display is powered down (0 disables)
    #[serde(default = "default_screen_off_secs")]
    pub screen_off_secs: u64,

    /// Wireless interface whose address is shown when online
    #[serde(default = "default_wireless_interface")]
    pub wireless_interface: String,

    /// File whose contents replace the computed status on the display
    #[serde(default = "default_override_path")]
    pub override_path: PathBuf,

    /// Directory holding `ui/` and `<arch>/wifi-connect`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Tick period of the LED blink thread
    #[serde(default = "default_led_interval_ms")]
    pub led_interval_ms: u64,
}

fn default_button_pin() -> u32 {
    17
}

fn default_gpio_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}

fn default_i2c_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-1")
}

fn default_i2c_address() -> u8 {
    0x3C
}

fn default_display_width() -> u32 {
    128
}

fn default_display_height() -> u32 {
    64
}

fn default_portal_ssid() -> String {
    "RPi-Setup".to_string()
}

fn default_screen_off_secs() -> u64 {
    120
}

fn default_wireless_interface() -> String {
    "wlan0".to_string()
}

fn default_override_path() -> PathBuf {
    PathBuf::from("/tmp/oled_override.txt")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("/usr/share/wifisetup")
}

fn default_led_interval_ms() -> u64 {
    500
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            button_pin: default_button_pin(),
            led_pin: None,
            gpio_chip: default_gpio_chip(),
            i2c_bus: default_i2c_bus(),
            i2c_address: default_i2c_address(),
            display_width: default_display_width(),
            display_height: default_display_height(),
            portal_ssid: default_portal_ssid(),
            portal_password: None,
            screen_off_secs: default_screen_off_secs(),
            wireless_interface: default_wireless_interface(),
            override_path: default_override_path(),
            assets_dir: default_assets_dir(),
            led_interval_ms: default_led_interval_ms(),
        }
    }
}

impl DeviceConfig {
    /// Idle timeout, or `None` when the screen never powers down.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.screen_off_secs > 0).then(|| Duration::from_secs(self.screen_off_secs))
    }

    pub fn hold_duration(&self) -> Duration {
        HOLD_DURATION
    }

    pub fn led_interval(&self) -> Duration {
        Duration::from_millis(self.led_interval_ms)
    }

    /// The LED replaces the display whenever an LED pin is configured.
    pub fn uses_led(&self) -> bool {
        self.led_pin.is_some()
    }

    pub fn ui_dir(&self) -> PathBuf {
        self.assets_dir.join("ui")
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.portal_ssid.trim().is_empty() {
            return Err(SetupError::InvalidConfig("portal SSID is empty".to_string()));
        }
        if self.display_width == 0 || self.display_height == 0 {
            return Err(SetupError::InvalidConfig(format!(
                "display dimensions must be non-zero (got {}x{})",
                self.display_width, self.display_height
            )));
        }
        if self.led_interval_ms == 0 {
            return Err(SetupError::InvalidConfig(
                "led_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration.
///
/// With `path == None` the default location is tried and a missing file
/// yields defaults. An explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<DeviceConfig, SetupError> {
    let (path, required) = match path {
        Some(p) => (p, true),
        None => (Path::new(CONFIG_PATH), false),
    };

    if !path.exists() && !required {
        info!("No config at {}, using defaults", path.display());
        return Ok(DeviceConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| SetupError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config: DeviceConfig = toml::from_str(&content).map_err(|source| SetupError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}
