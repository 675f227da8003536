//! Output of a one-shot device shell command.

/// Text the device prints when a command it ran went wrong.
const ERROR_MARKER: &str = "Error";

/// Raw output of a shell command plus the verdict on it.
///
/// The shell service has no exit status channel, so `succeeded` is derived
/// from the text alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResult {
    pub raw: String,
    pub succeeded: bool,
}

impl ShellResult {
    pub fn from_output(bytes: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(bytes).into_owned();
        let succeeded = !raw.contains(ERROR_MARKER);
        Self { raw, succeeded }
    }
}
