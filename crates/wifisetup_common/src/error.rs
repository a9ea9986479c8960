//! Error types for wifisetup.
//!
//! Every variant is a startup-time condition. Steady-state failures never
//! surface as `SetupError`; they are absorbed where they happen.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("{0} is an unsupported architecture.")]
    UnsupportedArchitecture(String),

    #[error("{} file not found.", .0.display())]
    PortalBinaryMissing(PathBuf),

    #[error("{} folder not found.", .0.display())]
    UiAssetsMissing(PathBuf),

    #[error("This system does not have the nmcli command. The network manager is required.")]
    NetworkManagerMissing,

    #[error("This program must be executed as root user.")]
    NotRoot,

    #[error("Unsupported display geometry {width}x{height}")]
    UnsupportedDisplay { width: u32, height: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SetupError {
    /// Process exit code used when startup aborts with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SetupError::NotRoot => 77,
            SetupError::InvalidConfig(_)
            | SetupError::ConfigRead { .. }
            | SetupError::ConfigParse { .. } => 78,
            _ => 1,
        }
    }
}
