//! Dex compilation.
//!
//! [`DexCompiler`] owns the stage contract (inputs present, stale output
//! cleared, exactly one `classes.dex` on success, nothing left behind on
//! failure). The actual conversion is delegated to a [`DexBackend`], which
//! in production is the SDK's `d8`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};
use vanced_java::CompiledClassSet;

/// File name of the single dex produced for a build unit.
pub const DEX_FILE: &str = "classes.dex";

#[derive(Error, Debug)]
pub enum DexError {
    #[error("No compiled classes to convert, check `paths.classDirs`")]
    NoInput,
    #[error("Failed to execute {program}: {source}")]
    Exec {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Dex conversion failed ({status}): {stderr}")]
    Exit { status: String, stderr: String },
    #[error("Dex backend produced no {DEX_FILE} in {0}")]
    MissingOutput(PathBuf),
    #[error("Expected a single dex file but the backend produced {0:?}")]
    MultipleDexFiles(Vec<String>),
    #[error("Failed to prepare dex output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Conversion settings handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexParameters {
    pub min_api: u32,
    pub debuggable: bool,
    /// One dex per input class instead of a single merged file.
    pub dex_per_class: bool,
    pub desugaring: bool,
    /// Platform API stubs used to resolve symbols while desugaring.
    pub boot_classpath: Vec<PathBuf>,
    /// Extra classes visible to desugaring but not converted.
    pub desugar_classpath: Vec<PathBuf>,
    /// Core library desugaring configuration.
    pub library_desugaring: Option<PathBuf>,
}

impl DexParameters {
    /// Debuggable, single merged dex, desugared against the boot classpath only.
    pub fn for_unit(min_api: u32, boot_classpath: Vec<PathBuf>) -> Self {
        Self {
            min_api,
            debuggable: true,
            dex_per_class: false,
            desugaring: true,
            boot_classpath,
            desugar_classpath: Vec::new(),
            library_desugaring: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexArtifact {
    pub dex_file: PathBuf,
    pub output_dir: PathBuf,
}

impl DexArtifact {
    /// The artifact a previous compile left in `output_dir`, if any.
    pub fn existing(output_dir: &Path) -> Option<Self> {
        let dex_file = output_dir.join(DEX_FILE);
        dex_file.is_file().then(|| Self {
            dex_file,
            output_dir: output_dir.to_path_buf(),
        })
    }
}

/// Converts class files or jars into dex files inside `output_dir`.
pub trait DexBackend: Send + Sync {
    fn convert(
        &self,
        params: &DexParameters,
        inputs: &[PathBuf],
        output_dir: &Path,
    ) -> Result<(), DexError>;
}

/// Runs the SDK's `d8` command-line dexer.
#[derive(Debug, Clone)]
pub struct D8Backend {
    executable: PathBuf,
}

impl D8Backend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(
        &self,
        params: &DexParameters,
        inputs: &[PathBuf],
        output_dir: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        args.push((if params.debuggable { "--debug" } else { "--release" }).into());
        args.push("--min-api".into());
        args.push(params.min_api.to_string().into());

        for lib in &params.boot_classpath {
            args.push("--lib".into());
            args.push(lib.into());
        }
        for cp in &params.desugar_classpath {
            args.push("--classpath".into());
            args.push(cp.into());
        }
        if !params.desugaring {
            args.push("--no-desugaring".into());
        }
        if let Some(config) = &params.library_desugaring {
            args.push("--desugared-lib".into());
            args.push(config.into());
        }
        if params.dex_per_class {
            args.push("--file-per-class-file".into());
        }

        args.push("--output".into());
        args.push(output_dir.into());

        // d8 has no `--` separator, so inputs must not look like flags.
        for input in inputs {
            args.push(Path::new(".").join(input).into());
        }
        args
    }

    pub fn command(&self, params: &DexParameters, inputs: &[PathBuf], output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.arguments(params, inputs, output_dir));
        cmd
    }
}

impl DexBackend for D8Backend {
    fn convert(
        &self,
        params: &DexParameters,
        inputs: &[PathBuf],
        output_dir: &Path,
    ) -> Result<(), DexError> {
        let output = self
            .command(params, inputs, output_dir)
            .output()
            .map_err(|source| DexError::Exec {
                program: self.executable.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(DexError::Exit {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!("d8: {}", line);
        }
        Ok(())
    }
}

pub struct DexCompiler<B> {
    backend: B,
}

impl<B: DexBackend> DexCompiler<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Convert every class of `classes` into `output_dir/classes.dex`.
    pub fn compile(
        &self,
        classes: &CompiledClassSet,
        params: &DexParameters,
        output_dir: &Path,
    ) -> Result<DexArtifact, DexError> {
        if classes.is_empty() {
            return Err(DexError::NoInput);
        }

        std::fs::create_dir_all(output_dir).map_err(|source| DexError::Output {
            path: output_dir.to_path_buf(),
            source,
        })?;
        clear_dex_files(output_dir)?;

        let inputs = classes.input_paths();
        debug!(
            "Converting {} classes from {} inputs into {}",
            classes.len(),
            inputs.len(),
            output_dir.display()
        );

        let result = self
            .backend
            .convert(params, &inputs, output_dir)
            .and_then(|()| single_dex(output_dir));

        match result {
            Ok(artifact) => {
                info!("Compiled dex to {}", artifact.dex_file.display());
                Ok(artifact)
            }
            Err(e) => {
                if let Err(cleanup) = clear_dex_files(output_dir) {
                    warn!("Failed to remove partial dex output: {}", cleanup);
                }
                Err(e)
            }
        }
    }
}

fn dex_files(output_dir: &Path) -> Result<Vec<String>, DexError> {
    let entries = std::fs::read_dir(output_dir).map_err(|source| DexError::Output {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.ends_with(".dex"))
        .collect();
    names.sort();
    Ok(names)
}

fn clear_dex_files(output_dir: &Path) -> Result<(), DexError> {
    for name in dex_files(output_dir)? {
        let path = output_dir.join(name);
        std::fs::remove_file(&path).map_err(|source| DexError::Output { path, source })?;
    }
    Ok(())
}

fn single_dex(output_dir: &Path) -> Result<DexArtifact, DexError> {
    let names = dex_files(output_dir)?;
    match names.as_slice() {
        [name] if name == DEX_FILE => Ok(DexArtifact {
            dex_file: output_dir.join(DEX_FILE),
            output_dir: output_dir.to_path_buf(),
        }),
        [] | [_] => Err(DexError::MissingOutput(output_dir.to_path_buf())),
        _ => Err(DexError::MultipleDexFiles(names)),
    }
}
