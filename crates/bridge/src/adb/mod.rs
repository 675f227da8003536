//! [`DeviceBridge`] backed by a local adb server.
//!
//! Every operation opens its own connection to the server, which is how the
//! host protocol expects to be used: one service per socket.

mod wire;

use crate::bridge::DeviceBridge;
use crate::device::{Device, DeviceState, parse_device_list};
use crate::error::BridgeError;
use crate::shell::ShellResult;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use wire::Connection;

pub const DEFAULT_PORT: u16 = 5037;
const PORT_ENV: &str = "ANDROID_ADB_SERVER_PORT";

#[derive(Debug, Clone)]
pub struct AdbClient {
    addr: SocketAddr,
    /// Used to start the server; without it the server must already run.
    executable: Option<PathBuf>,
}

impl AdbClient {
    pub fn new(addr: SocketAddr, executable: Option<PathBuf>) -> Self {
        Self { addr, executable }
    }

    /// Local server on the port from `ANDROID_ADB_SERVER_PORT`, or 5037.
    pub fn from_env(executable: Option<PathBuf>) -> Self {
        let port = std::env::var(PORT_ENV)
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, port)), executable)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    fn connect(&self) -> Result<Connection<TcpStream>, BridgeError> {
        let stream = TcpStream::connect(self.addr).map_err(|source| BridgeError::Connect {
            addr: self.addr,
            source,
        })?;
        Ok(Connection::new(stream))
    }

    /// A connection already switched to the given device.
    fn transport(&self, serial: &str) -> Result<Connection<TcpStream>, BridgeError> {
        let mut conn = self.connect()?;
        conn.request(&format!("host:transport:{serial}"))?;
        Ok(conn)
    }
}

impl DeviceBridge for AdbClient {
    fn start(&self) -> Result<(), BridgeError> {
        let Some(adb) = self.executable.as_ref().filter(|p| p.is_file()) else {
            debug!("No adb executable, assuming the server runs on {}", self.addr);
            return Ok(());
        };

        let output = Command::new(adb)
            .arg("start-server")
            .env(PORT_ENV, self.addr.port().to_string())
            .output()
            .map_err(|e| BridgeError::StartServer {
                program: adb.clone(),
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::StartServer {
                program: adb.clone(),
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }

    fn devices(&self) -> Result<Vec<Device>, BridgeError> {
        let mut conn = self.connect()?;
        conn.request("host:devices")?;
        parse_device_list(&conn.read_hex_string()?)
    }

    fn state(&self, serial: &str) -> Result<DeviceState, BridgeError> {
        let mut conn = self.connect()?;
        conn.request(&format!("host-serial:{serial}:get-state"))?;
        Ok(DeviceState::parse(&conn.read_hex_string()?))
    }

    fn push(&self, serial: &str, bytes: &[u8], remote_path: &str) -> Result<(), BridgeError> {
        let mut conn = self.transport(serial)?;
        conn.request("sync:")?;
        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        conn.sync_send(remote_path, bytes, mtime)?;
        debug!("Pushed {} bytes to {}:{}", bytes.len(), serial, remote_path);
        Ok(())
    }

    fn exec_shell(
        &self,
        serial: &str,
        command: &str,
        args: &[&str],
    ) -> Result<ShellResult, BridgeError> {
        let command_line = shell_command_line(command, args)?;
        let mut conn = self.transport(serial)?;
        conn.request(&format!("shell:{command_line}"))?;
        let output = conn.read_to_end()?;
        debug!("{}$ {} -> {} bytes", serial, command_line, output.len());
        Ok(ShellResult::from_output(&output))
    }
}

fn shell_command_line(command: &str, args: &[&str]) -> Result<String, BridgeError> {
    let words = std::iter::once(command).chain(args.iter().copied());
    shlex::try_join(words).map_err(|_| {
        BridgeError::Quote(
            args.iter()
                .find(|a| a.contains('\0'))
                .unwrap_or(&command)
                .to_string(),
        )
    })
}
