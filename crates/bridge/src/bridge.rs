use crate::device::{Device, DeviceState};
use crate::error::{BridgeError, DeployError};
use crate::shell::ShellResult;
use tracing::{debug, info};

/// Blocking access to attached devices. Each call is attempted once.
pub trait DeviceBridge {
    /// Make sure the bridge server is up.
    fn start(&self) -> Result<(), BridgeError>;

    fn devices(&self) -> Result<Vec<Device>, BridgeError>;

    /// Fresh state query for one device.
    fn state(&self, serial: &str) -> Result<DeviceState, BridgeError>;

    /// Write `bytes` to the absolute `remote_path` on the device.
    fn push(&self, serial: &str, bytes: &[u8], remote_path: &str) -> Result<(), BridgeError>;

    fn exec_shell(
        &self,
        serial: &str,
        command: &str,
        args: &[&str],
    ) -> Result<ShellResult, BridgeError>;

    fn remove(&self, serial: &str, remote_path: &str) -> Result<ShellResult, BridgeError> {
        self.exec_shell(serial, "rm", &[remote_path])
    }
}

/// The single device that is ready for commands.
///
/// A device whose state query fails counts as not ready. Anything other than
/// exactly one ready device is an error naming how many were found.
pub fn discover_device<B: DeviceBridge + ?Sized>(bridge: &B) -> Result<Device, DeployError> {
    bridge.start()?;

    let mut ready: Vec<Device> = bridge
        .devices()?
        .into_iter()
        .filter_map(|device| match bridge.state(&device.serial) {
            Ok(DeviceState::Device) => Some(Device {
                state: DeviceState::Device,
                ..device
            }),
            Ok(state) => {
                debug!("Ignoring {} in state {}", device.serial, state);
                None
            }
            Err(e) => {
                debug!("Ignoring {}, state query failed: {}", device.serial, e);
                None
            }
        })
        .collect();

    if ready.len() != 1 {
        return Err(DeployError::DeviceCount(ready.len()));
    }
    let device = ready.remove(0);
    info!("Using device {}", device.serial);
    Ok(device)
}
