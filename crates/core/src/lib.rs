pub mod assemble;
pub mod config;
pub mod dex;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod sdk;

pub use assemble::{AssembleInputs, Assembler, PackageArtifact};
pub use config::{ConfigError, Overrides, UnitConfig, load_context};
pub use dex::{D8Backend, DexArtifact, DexBackend, DexCompiler, DexError, DexParameters};
pub use error::{AssembleError, PipelineError, Result};
pub use pipeline::{CompileOutcome, Pipeline};
pub use sdk::{AndroidSdk, SdkError};
