//! The immutable description of one build unit.
//!
//! A [`BuildContext`] is resolved once from configuration and then passed by
//! reference through every stage. Stages never write back into it; anything
//! they discover is returned to the caller instead.

use crate::error::{VancedError, VancedResult};
use crate::variant::Variant;
use std::path::{Path, PathBuf};

/// Version string Gradle reports for projects that never set one.
const UNSPECIFIED_VERSION: &str = "unspecified";

/// Build unit whose deployment is always skipped.
pub const TEMPLATE_PROJECT: &str = "Template";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl ProjectInfo {
    /// The version, unless it is absent, empty or the `unspecified` placeholder.
    pub fn release_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != UNSPECIFIED_VERSION)
    }

    pub fn is_template(&self) -> bool {
        self.name == TEMPLATE_PROJECT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub project_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Compiler output directories or jars holding `.class` files.
    pub class_dirs: Vec<PathBuf>,
    /// Packed resources produced by the resource compiler, if it ran.
    pub resource_apk: PathBuf,
    /// Prebuilt host application package (Injector only).
    pub host_apk: Option<PathBuf>,
}

impl BuildPaths {
    pub fn intermediates(&self) -> PathBuf {
        self.build_dir.join("intermediates")
    }

    pub fn dex_dir(&self) -> PathBuf {
        self.intermediates().join("dex")
    }

    /// Where compile-dex records the discovered entry point for `make`.
    pub fn entry_point_file(&self) -> PathBuf {
        self.intermediates().join("pluginClass.json")
    }

    pub fn injector_staging_dir(&self) -> PathBuf {
        self.intermediates().join("injector")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidSettings {
    pub sdk_root: Option<PathBuf>,
    pub min_sdk: u32,
    pub compile_sdk: Option<u32>,
}

impl Default for AndroidSettings {
    fn default() -> Self {
        Self {
            sdk_root: None,
            min_sdk: 24,
            compile_sdk: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub project: ProjectInfo,
    pub variant: Variant,
    pub paths: BuildPaths,
    pub android: AndroidSettings,
}

impl BuildContext {
    pub fn name(&self) -> &str {
        &self.project.name
    }

    /// Fails with [`VancedError::UnsetVersion`] when the unit has no usable version.
    pub fn require_version(&self) -> VancedResult<&str> {
        self.project
            .release_version()
            .ok_or_else(|| VancedError::UnsetVersion {
                unit: self.project.name.clone(),
            })
    }

    /// Local path of the package `make` produces for this unit.
    pub fn package_file(&self) -> VancedResult<PathBuf> {
        match &self.variant {
            Variant::Plugin(_) | Variant::Core { .. } => Ok(self
                .paths
                .build_dir
                .join(format!("{}.zip", self.project.name))),
            Variant::Injector => Ok(self.paths.build_dir.join("injector.zip")),
            Variant::Regular => Err(VancedError::RegularVariant {
                operation: "name a package file",
            }),
        }
    }

    /// Convenience for tests and tools that only need a minimal context.
    pub fn for_project(name: &str, version: Option<&str>, variant: Variant, dir: &Path) -> Self {
        Self {
            project: ProjectInfo {
                name: name.to_string(),
                version: version.map(str::to_string),
                description: None,
            },
            variant,
            paths: BuildPaths {
                project_dir: dir.to_path_buf(),
                build_dir: dir.join("build"),
                class_dirs: Vec::new(),
                resource_apk: dir.join("build/intermediates/res.apk"),
                host_apk: None,
            },
            android: AndroidSettings::default(),
        }
    }
}
