use crate::config::ConfigError;
use crate::dex::DexError;
use crate::sdk::SdkError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vanced_api::VancedError;
use vanced_java::{ClassSetError, ScanError};

/// Failures while producing a package artifact.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error(transparent)]
    Unit(#[from] VancedError),
    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Plugin `{unit}` has no entry point to put in its manifest")]
    NoEntryPoint { unit: String },
    #[error("No dex file at {0}, run compile-dex first")]
    MissingDex(PathBuf),
    #[error("Host application package not found at {0}")]
    MissingHostApk(PathBuf),
    #[error("Host application package is not configured, set `paths.hostApk`")]
    HostApkNotConfigured,
}

impl AssembleError {
    pub(crate) fn file(path: &Path) -> impl FnOnce(std::io::Error) -> AssembleError + '_ {
        move |source| AssembleError::File {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive(path: &Path) -> impl FnOnce(zip::result::ZipError) -> AssembleError + '_ {
        move |source| AssembleError::Archive {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Any failure of a pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Unit(#[from] VancedError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error(transparent)]
    Classes(#[from] ClassSetError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Dex(#[from] DexError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid entry point record {path}: {source}")]
    EntryPointRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No recorded plugin entry point at {0}, run compile-dex first")]
    MissingEntryPoint(PathBuf),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
