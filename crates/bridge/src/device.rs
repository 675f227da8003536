use crate::error::BridgeError;
use std::fmt;

/// Connection state as reported by the adb server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Online and ready for commands.
    Device,
    Offline,
    Unauthorized,
    Bootloader,
    Recovery,
    Sideload,
    NoPermissions,
    Other(String),
}

impl DeviceState {
    pub fn parse(state: &str) -> Self {
        match state.trim() {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            "bootloader" => DeviceState::Bootloader,
            "recovery" => DeviceState::Recovery,
            "sideload" => DeviceState::Sideload,
            s if s.starts_with("no permissions") => DeviceState::NoPermissions,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DeviceState::Device)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Device => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Bootloader => "bootloader",
            DeviceState::Recovery => "recovery",
            DeviceState::Sideload => "sideload",
            DeviceState::NoPermissions => "no permissions",
            DeviceState::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub serial: String,
    /// State from the device listing; may be stale by the time it is used.
    pub state: DeviceState,
}

impl Device {
    pub fn new(serial: impl Into<String>, state: DeviceState) -> Self {
        Self {
            serial: serial.into(),
            state,
        }
    }
}

/// Parse the `host:devices` payload, one `<serial>\t<state>` per line.
pub(crate) fn parse_device_list(payload: &str) -> Result<Vec<Device>, BridgeError> {
    payload
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (serial, state) = line
                .split_once('\t')
                .ok_or_else(|| BridgeError::Protocol(format!("bad device line {line:?}")))?;
            Ok(Device::new(serial, DeviceState::parse(state)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let devices =
            parse_device_list("emulator-5554\tdevice\nR58M1234\tunauthorized\n0123\tno permissions (user in plugdev group)\n")
                .unwrap();

        assert_eq!(
            devices,
            vec![
                Device::new("emulator-5554", DeviceState::Device),
                Device::new("R58M1234", DeviceState::Unauthorized),
                Device::new("0123", DeviceState::NoPermissions),
            ]
        );
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_device_list("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_line() {
        assert!(parse_device_list("garbage").is_err());
    }
}
