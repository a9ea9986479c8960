//! wifisetup common - configuration, errors and NetworkManager access
//! shared by the provisioning daemon.

pub mod command;
pub mod config;
pub mod error;
pub mod network;
pub mod types;

pub use command::{CommandResult, CommandRunner, ExecutionStatus, SystemRunner};
pub use config::{load_config, DeviceConfig, HOLD_DURATION, POLL_INTERVAL, RECOVERY_SETTLE};
pub use error::SetupError;
pub use network::NetworkManager;
pub use types::WifiState;
