//! In-memory [`DeviceBridge`] that records every call.

use crate::bridge::DeviceBridge;
use crate::device::{Device, DeviceState};
use crate::error::BridgeError;
use crate::shell::ShellResult;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Devices,
    State(String),
    Push {
        serial: String,
        remote_path: String,
        bytes: Vec<u8>,
    },
    Shell {
        serial: String,
        command_line: String,
    },
}

#[derive(Default)]
pub struct FakeBridge {
    devices: Vec<Device>,
    broken: HashSet<String>,
    states: HashMap<String, DeviceState>,
    responses: HashMap<String, String>,
    fail_push: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, serial: &str, state: DeviceState) -> Self {
        self.devices.push(Device::new(serial, state));
        self
    }

    /// Listed as ready, but its state query fails.
    pub fn with_broken_device(mut self, serial: &str) -> Self {
        self.devices.push(Device::new(serial, DeviceState::Device));
        self.broken.insert(serial.to_string());
        self
    }

    /// State returned by the per-device query instead of the listed one.
    pub fn with_state_override(mut self, serial: &str, state: DeviceState) -> Self {
        self.states.insert(serial.to_string(), state);
        self
    }

    /// Output for every shell invocation of `command`.
    pub fn with_shell_response(mut self, command: &str, response: &str) -> Self {
        self.responses
            .insert(command.to_string(), response.to_string());
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    pub fn pushes(&self) -> Vec<(String, String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Push {
                    serial,
                    remote_path,
                    bytes,
                } => Some((serial, remote_path, bytes)),
                _ => None,
            })
            .collect()
    }

    pub fn shell_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Shell { command_line, .. } => Some(command_line),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) {
        self.lock().push(call);
    }
}

impl DeviceBridge for FakeBridge {
    fn start(&self) -> Result<(), BridgeError> {
        self.record(Call::Start);
        Ok(())
    }

    fn devices(&self) -> Result<Vec<Device>, BridgeError> {
        self.record(Call::Devices);
        Ok(self.devices.clone())
    }

    fn state(&self, serial: &str) -> Result<DeviceState, BridgeError> {
        self.record(Call::State(serial.to_string()));
        if self.broken.contains(serial) {
            return Err(BridgeError::Refused {
                request: format!("host-serial:{serial}:get-state"),
                message: "device offline".to_string(),
            });
        }
        if let Some(state) = self.states.get(serial) {
            return Ok(state.clone());
        }
        self.devices
            .iter()
            .find(|d| d.serial == serial)
            .map(|d| d.state.clone())
            .ok_or_else(|| BridgeError::Refused {
                request: format!("host-serial:{serial}:get-state"),
                message: format!("device '{serial}' not found"),
            })
    }

    fn push(&self, serial: &str, bytes: &[u8], remote_path: &str) -> Result<(), BridgeError> {
        self.record(Call::Push {
            serial: serial.to_string(),
            remote_path: remote_path.to_string(),
            bytes: bytes.to_vec(),
        });
        if self.fail_push {
            return Err(BridgeError::Refused {
                request: "sync:".to_string(),
                message: "couldn't create file: Permission denied".to_string(),
            });
        }
        Ok(())
    }

    fn exec_shell(
        &self,
        serial: &str,
        command: &str,
        args: &[&str],
    ) -> Result<ShellResult, BridgeError> {
        let mut command_line = command.to_string();
        for arg in args {
            command_line.push(' ');
            command_line.push_str(arg);
        }
        self.record(Call::Shell {
            serial: serial.to_string(),
            command_line,
        });
        let response = self.responses.get(command).cloned().unwrap_or_default();
        Ok(ShellResult::from_output(response.as_bytes()))
    }
}
