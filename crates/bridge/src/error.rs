use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use vanced_api::VancedError;

/// Failures talking to the adb server or a device.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to connect to the adb server at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("adb I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("adb server refused `{request}`: {message}")]
    Refused { request: String, message: String },
    #[error("Malformed adb response: {0}")]
    Protocol(String),
    #[error("Failed to start the adb server with {program}: {detail}")]
    StartServer { program: PathBuf, detail: String },
    #[error("Cannot quote shell argument {0:?}")]
    Quote(String),
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Unit(#[from] VancedError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("Only one ADB device should be connected, but {0} were!")]
    DeviceCount(usize),
    #[error("`{command}` failed on {serial}: {response}")]
    Shell {
        serial: String,
        command: String,
        response: String,
    },
}
