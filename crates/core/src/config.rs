//! `vanced.json` loading.
//!
//! The file is read once and resolved into an immutable [`BuildContext`];
//! relative paths are anchored at the project directory and unset ones fall
//! back to the Gradle-style layout the upstream compilers produce.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use vanced_api::{
    AndroidSettings, BuildContext, BuildPaths, PluginInfo, ProjectInfo, Variant,
};

pub const CONFIG_FILE: &str = "vanced.json";

const DEFAULT_MIN_SDK: u32 = 24;

/// Compiler output directories probed when `paths.classDirs` is not set,
/// relative to the build directory.
const DEFAULT_CLASS_DIRS: &[&str] = &[
    "tmp/kotlin-classes/debug",
    "intermediates/javac/debug/classes",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No {CONFIG_FILE} found in {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Cannot derive a build unit name from {0}, set `name`")]
    NoName(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_variant")]
    pub variant: Variant,
    #[serde(default)]
    pub min_sdk: Option<u32>,
    #[serde(default)]
    pub compile_sdk: Option<u32>,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsConfig {
    pub build_dir: Option<PathBuf>,
    pub class_dirs: Option<Vec<PathBuf>>,
    pub resource_apk: Option<PathBuf>,
    pub host_apk: Option<PathBuf>,
    pub android_sdk: Option<PathBuf>,
}

/// Values supplied on the command line, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub android_sdk: Option<PathBuf>,
}

fn default_variant() -> Variant {
    Variant::Plugin(PluginInfo::default())
}

impl UnitConfig {
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(ConfigError::NotFound(project_dir.to_path_buf()));
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content, &path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn resolve(
        self,
        project_dir: &Path,
        overrides: &Overrides,
    ) -> Result<BuildContext, ConfigError> {
        let name = match self.name {
            Some(name) => name,
            None => project_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| ConfigError::NoName(project_dir.to_path_buf()))?,
        };

        let anchor = |p: PathBuf| {
            if p.is_absolute() {
                p
            } else {
                project_dir.join(p)
            }
        };

        let build_dir = self
            .paths
            .build_dir
            .map(anchor)
            .unwrap_or_else(|| project_dir.join("build"));

        let class_dirs = match self.paths.class_dirs {
            Some(dirs) => dirs.into_iter().map(anchor).collect(),
            None => DEFAULT_CLASS_DIRS
                .iter()
                .map(|d| build_dir.join(d))
                .filter(|d| d.exists())
                .collect(),
        };

        let resource_apk = self
            .paths
            .resource_apk
            .map(anchor)
            .unwrap_or_else(|| build_dir.join("intermediates/res.apk"));

        let sdk_root = overrides
            .android_sdk
            .clone()
            .or(self.paths.android_sdk.map(anchor));

        let ctx = BuildContext {
            project: ProjectInfo {
                name,
                version: self.version,
                description: self.description,
            },
            variant: self.variant,
            paths: BuildPaths {
                project_dir: project_dir.to_path_buf(),
                build_dir,
                class_dirs,
                resource_apk,
                host_apk: self.paths.host_apk.map(anchor),
            },
            android: AndroidSettings {
                sdk_root,
                min_sdk: self.min_sdk.unwrap_or(DEFAULT_MIN_SDK),
                compile_sdk: self.compile_sdk,
            },
        };

        debug!(
            "Resolved build unit {} ({}) with {} class roots",
            ctx.name(),
            ctx.variant.kind(),
            ctx.paths.class_dirs.len()
        );
        Ok(ctx)
    }
}

/// Read `vanced.json` from `project_dir` and resolve it.
pub fn load_context(project_dir: &Path, overrides: &Overrides) -> Result<BuildContext, ConfigError> {
    UnitConfig::load(project_dir)?.resolve(project_dir, overrides)
}
