#[derive(Debug, thiserror::Error)]
pub enum VancedError {
    #[error("The regular variant has no remote path; refusing to {operation}")]
    RegularVariant { operation: &'static str },
    #[error("Version of build unit `{unit}` is unset")]
    UnsetVersion { unit: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type VancedResult<T> = std::result::Result<T, VancedError>;
