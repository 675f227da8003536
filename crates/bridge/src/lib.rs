pub mod adb;
pub mod bridge;
pub mod deploy;
pub mod device;
pub mod error;
pub mod shell;

#[cfg(any(test, feature = "fixtures"))]
pub mod fake;

pub use adb::AdbClient;
pub use bridge::{DeviceBridge, discover_device};
pub use deploy::{DeployReport, Deployer, LAUNCH_COMPONENT};
pub use device::{Device, DeviceState};
pub use error::{BridgeError, DeployError};
pub use shell::ShellResult;
