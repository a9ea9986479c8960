//! Startup checks.
//!
//! Everything here runs once before any thread is started. A failure aborts
//! startup; nothing is retried.

use std::path::{Path, PathBuf};
use tracing::info;
use wifisetup_common::{DeviceConfig, NetworkManager, SetupError};

pub const PORTAL_BINARY_NAME: &str = "wifi-connect";

/// Machine names for which a portal binary is shipped.
pub const SUPPORTED_ARCHITECTURES: &[&str] = &["aarch64", "armv7l", "x86_64", "i686"];

/// Run every startup check in order. Returns the portal binary for this
/// machine.
pub fn check_environment(
    config: &DeviceConfig,
    network: &NetworkManager,
) -> Result<PathBuf, SetupError> {
    config.validate()?;

    check_ui_dir(&config.assets_dir)?;
    let architecture = machine_architecture()?;
    let portal_binary = portal_binary_path(&config.assets_dir, &architecture)?;

    if !network.is_available() {
        return Err(SetupError::NetworkManagerMissing);
    }
    check_privilege()?;

    info!(
        "[BOOT] Environment ok (arch={}, portal={})",
        architecture,
        portal_binary.display()
    );
    Ok(portal_binary)
}

/// Runtime machine name as reported by `uname -m`.
pub fn machine_architecture() -> Result<String, SetupError> {
    let uts = nix::sys::utsname::uname().map_err(std::io::Error::from)?;
    Ok(uts.machine().to_string_lossy().into_owned())
}

/// `<assets>/ui` must be a directory.
pub fn check_ui_dir(assets_dir: &Path) -> Result<PathBuf, SetupError> {
    let ui_dir = assets_dir.join("ui");
    if !ui_dir.is_dir() {
        return Err(SetupError::UiAssetsMissing(ui_dir));
    }
    Ok(ui_dir)
}

/// `<assets>/<arch>/wifi-connect`, which must exist for a supported arch.
pub fn portal_binary_path(assets_dir: &Path, architecture: &str) -> Result<PathBuf, SetupError> {
    if !SUPPORTED_ARCHITECTURES.contains(&architecture) {
        return Err(SetupError::UnsupportedArchitecture(architecture.to_string()));
    }
    let binary = assets_dir.join(architecture).join(PORTAL_BINARY_NAME);
    if !binary.is_file() {
        return Err(SetupError::PortalBinaryMissing(binary));
    }
    Ok(binary)
}

/// Toggling networking needs root.
pub fn check_privilege() -> Result<(), SetupError> {
    if nix::unistd::Uid::effective().is_root() {
        Ok(())
    } else {
        Err(SetupError::NotRoot)
    }
}
