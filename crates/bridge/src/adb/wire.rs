//! adb host protocol framing.
//!
//! Requests are a four hex digit length followed by the payload. The server
//! answers `OKAY`, or `FAIL` plus a hex-length message. File transfer runs
//! over the `sync:` sub-protocol, whose frames are a four byte id and a
//! little-endian `u32`.

use crate::error::BridgeError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const OKAY: &[u8; 4] = b"OKAY";
const FAIL: &[u8; 4] = b"FAIL";

/// Largest payload of one sync `DATA` frame.
pub(crate) const SYNC_CHUNK: usize = 64 * 1024;

/// Regular file, `rw-r--r--`.
pub(crate) const PUSH_MODE: u32 = 0o100644;

pub(crate) struct Connection<S> {
    stream: S,
}

impl<S: Read + Write> Connection<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Send one request and wait for the server to accept it.
    pub(crate) fn request(&mut self, request: &str) -> Result<(), BridgeError> {
        if request.len() > 0xFFFF {
            return Err(BridgeError::Protocol(format!(
                "request of {} bytes is too long",
                request.len()
            )));
        }
        write!(self.stream, "{:04x}{}", request.len(), request)?;
        self.stream.flush()?;
        self.read_status(request)
    }

    fn read_status(&mut self, request: &str) -> Result<(), BridgeError> {
        let mut status = [0u8; 4];
        self.stream.read_exact(&mut status)?;
        match &status {
            OKAY => Ok(()),
            FAIL => {
                let message = self.read_hex_string().unwrap_or_default();
                Err(BridgeError::Refused {
                    request: request.to_string(),
                    message,
                })
            }
            other => Err(BridgeError::Protocol(format!(
                "unexpected status {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// A payload prefixed with its length in four hex digits.
    pub(crate) fn read_hex_string(&mut self) -> Result<String, BridgeError> {
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len)?;
        let len = std::str::from_utf8(&len)
            .ok()
            .and_then(|s| usize::from_str_radix(s, 16).ok())
            .ok_or_else(|| BridgeError::Protocol(format!("bad length prefix {len:?}")))?;

        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload)?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Everything the service writes until it closes the stream.
    pub(crate) fn read_to_end(&mut self) -> Result<Vec<u8>, BridgeError> {
        let mut out = Vec::new();
        self.stream.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Send `bytes` as `remote_path` over an already opened `sync:` service.
    pub(crate) fn sync_send(
        &mut self,
        remote_path: &str,
        bytes: &[u8],
        mtime: u32,
    ) -> Result<(), BridgeError> {
        let header = format!("{remote_path},{PUSH_MODE}");
        self.sync_frame(b"SEND", header.as_bytes())?;
        for chunk in bytes.chunks(SYNC_CHUNK) {
            self.sync_frame(b"DATA", chunk)?;
        }
        self.stream.write_all(b"DONE")?;
        self.stream.write_u32::<LittleEndian>(mtime)?;
        self.stream.flush()?;

        let mut id = [0u8; 4];
        self.stream.read_exact(&mut id)?;
        let len = self.stream.read_u32::<LittleEndian>()? as usize;
        match &id {
            OKAY => {}
            FAIL => {
                let mut message = vec![0u8; len];
                self.stream.read_exact(&mut message)?;
                return Err(BridgeError::Refused {
                    request: format!("sync SEND {remote_path}"),
                    message: String::from_utf8_lossy(&message).into_owned(),
                });
            }
            other => {
                return Err(BridgeError::Protocol(format!(
                    "unexpected sync reply {:?}",
                    String::from_utf8_lossy(other)
                )));
            }
        }

        self.sync_frame(b"QUIT", &[])?;
        self.stream.flush()?;
        Ok(())
    }

    fn sync_frame(&mut self, id: &[u8; 4], payload: &[u8]) -> Result<(), BridgeError> {
        self.stream.write_all(id)?;
        self.stream.write_u32::<LittleEndian>(payload.len() as u32)?;
        self.stream.write_all(payload)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Replays canned server bytes and captures what the client sends.
    pub(crate) struct ScriptedStream {
        pub(crate) input: Cursor<Vec<u8>>,
        pub(crate) output: Vec<u8>,
    }

    impl ScriptedStream {
        pub(crate) fn new(server: &[u8]) -> Self {
            Self {
                input: Cursor::new(server.to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_request_framing() {
        let mut conn = Connection::new(ScriptedStream::new(b"OKAY0015emulator-5554\tdevice\n"));
        conn.request("host:devices").unwrap();
        let payload = conn.read_hex_string().unwrap();

        assert_eq!(conn.stream.output, b"000chost:devices");
        assert_eq!(payload, "emulator-5554\tdevice\n");
    }

    #[test]
    fn test_fail_carries_message() {
        let mut conn = Connection::new(ScriptedStream::new(b"FAIL0014device 'x' not found"));
        let err = conn.request("host-serial:x:get-state").unwrap_err();
        assert!(err.to_string().contains("device 'x' not found"));
    }

    #[test]
    fn test_garbage_status() {
        let mut conn = Connection::new(ScriptedStream::new(b"WHAT"));
        assert!(matches!(
            conn.request("host:version"),
            Err(BridgeError::Protocol(_))
        ));
    }

    #[test]
    fn test_sync_send_frames() {
        let mut server = b"OKAY".to_vec();
        server.extend_from_slice(&0u32.to_le_bytes());
        let mut conn = Connection::new(ScriptedStream::new(&server));

        let payload = vec![7u8; SYNC_CHUNK + 10];
        conn.sync_send("/sdcard/x.zip", &payload, 0).unwrap();

        let out = &conn.stream.output;
        let header = format!("/sdcard/x.zip,{PUSH_MODE}");
        assert_eq!(&out[..4], b"SEND");
        assert_eq!(
            u32::from_le_bytes(out[4..8].try_into().unwrap()) as usize,
            header.len()
        );
        assert_eq!(&out[8..8 + header.len()], header.as_bytes());

        let first = 8 + header.len();
        assert_eq!(&out[first..first + 4], b"DATA");
        assert_eq!(
            u32::from_le_bytes(out[first + 4..first + 8].try_into().unwrap()) as usize,
            SYNC_CHUNK
        );
        let second = first + 8 + SYNC_CHUNK;
        assert_eq!(&out[second..second + 4], b"DATA");
        assert_eq!(
            u32::from_le_bytes(out[second + 4..second + 8].try_into().unwrap()),
            10
        );
        let done = second + 8 + 10;
        assert_eq!(&out[done..done + 4], b"DONE");
        assert_eq!(&out[done + 8..done + 12], b"QUIT");
    }

    #[test]
    fn test_sync_send_failure() {
        let message = b"couldn't create file: Permission denied";
        let mut server = b"FAIL".to_vec();
        server.extend_from_slice(&(message.len() as u32).to_le_bytes());
        server.extend_from_slice(message);
        let mut conn = Connection::new(ScriptedStream::new(&server));

        let err = conn.sync_send("/system/x.zip", b"PK", 0).unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
    }
}
