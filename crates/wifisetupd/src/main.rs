//! wifisetupd - WiFi provisioning daemon
//!
//! Hold the setup button to open a captive portal; the display or LED shows
//! connectivity the rest of the time.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wifisetup_common::{load_config, DeviceConfig, SetupError};
use wifisetupd::service::WifiSetupService;

#[derive(Parser, Debug)]
#[command(name = "wifisetupd")]
#[command(about = "Linux WiFi provisioning tool.", long_about = None)]
#[command(version)]
struct Cli {
    /// The GPIO pin that the WiFi button is connected to (default = 17)
    #[arg(short = 'b', long)]
    button_pin: Option<u32>,

    /// The I2C bus address of the display, in hex (default = 3c)
    #[arg(short = 'a', long, value_parser = parse_hex_address)]
    i2c_address: Option<u8>,

    /// Drive a status LED on this GPIO pin instead of using a display
    #[arg(short = 'l', long)]
    led_pin: Option<u32>,

    /// The display width in pixels (default = 128)
    #[arg(short = 'w', long)]
    display_width: Option<u32>,

    /// The display height in pixels (default = 64)
    #[arg(short = 'v', long)]
    display_height: Option<u32>,

    /// The portal SSID to connect your mobile/tablet to (default = RPi-Setup)
    #[arg(short = 's', long)]
    ssid: Option<String>,

    /// The portal password when connecting your mobile/tablet
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// The screen off timer in seconds (default = 120). Set to 0 to disable.
    #[arg(short = 'o', long)]
    screen_off_seconds: Option<u64>,

    /// Config file (default = /etc/wifisetup/config.toml)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory holding the portal UI and binaries
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Enable debugging.
    #[arg(short = 'd', long)]
    debug: bool,
}

impl Cli {
    /// Command line values win over the config file.
    fn apply(&self, config: &mut DeviceConfig) {
        if let Some(pin) = self.button_pin {
            config.button_pin = pin;
        }
        if let Some(address) = self.i2c_address {
            config.i2c_address = address;
        }
        if self.led_pin.is_some() {
            config.led_pin = self.led_pin;
        }
        if let Some(width) = self.display_width {
            config.display_width = width;
        }
        if let Some(height) = self.display_height {
            config.display_height = height;
        }
        if let Some(ssid) = &self.ssid {
            config.portal_ssid = ssid.clone();
        }
        if self.password.is_some() {
            config.portal_password = self.password.clone();
        }
        if let Some(secs) = self.screen_off_seconds {
            config.screen_off_secs = secs;
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = dir.clone();
        }
    }
}

fn parse_hex_address(value: &str) -> Result<u8, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid I2C address '{}': {}", value, e))
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        error!("[FATAL] {:#}", e);
        let code = e
            .downcast_ref::<SetupError>()
            .map(SetupError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("[BOOT] wifisetupd v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);

    let service = WifiSetupService::start(config)?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let worker = tokio::task::spawn_blocking(move || service.run(shutdown_rx));

    wait_for_shutdown().await?;
    info!("Shutdown requested");
    let _ = shutdown_tx.send(());

    worker.await.context("service thread panicked")??;
    info!("wifisetupd stopped");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("waiting for Ctrl+C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address() {
        assert_eq!(parse_hex_address("3c"), Ok(0x3C));
        assert_eq!(parse_hex_address("0x3D"), Ok(0x3D));
        assert!(parse_hex_address("zz").is_err());
        assert!(parse_hex_address("1ff").is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["wifisetupd", "-l", "27", "-s", "Shed", "-o", "0", "-a", "3d"]);
        let mut config = DeviceConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.led_pin, Some(27));
        assert_eq!(config.portal_ssid, "Shed");
        assert_eq!(config.screen_off_secs, 0);
        assert_eq!(config.i2c_address, 0x3D);
        assert_eq!(config.button_pin, 17);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
