//! Package assembly, one rule per variant.
//!
//! - Plugin and Core: `manifest.json`, then the dex, then the packed
//!   resources (if the resource compiler has produced them).
//! - Injector: the `lib/` and `classes*` entries of the host package.
//! - Regular: nothing.

mod injector;
mod package;

pub use package::{PLATFORM_MANIFEST, merge_resources};

use crate::dex::DexArtifact;
use crate::error::AssembleError;
use std::path::{Path, PathBuf};
use tracing::info;
use vanced_api::{
    BuildContext, CoreManifest, EntryPoint, PackageManifest, PluginManifest, Variant,
};

/// A finished package on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArtifact {
    /// File name, which is also the name used on the device.
    pub name: String,
    pub path: PathBuf,
}

impl PackageArtifact {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { name, path }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// What the compile stage hands to the assembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleInputs<'a> {
    pub dex: Option<&'a DexArtifact>,
    pub entry_point: Option<&'a EntryPoint>,
}

pub struct Assembler<'a> {
    ctx: &'a BuildContext,
}

impl<'a> Assembler<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    /// The manifest a Plugin or Core package carries, `None` for the others.
    pub fn manifest(
        &self,
        entry_point: Option<&EntryPoint>,
    ) -> Result<Option<PackageManifest>, AssembleError> {
        let ctx = self.ctx;
        match &ctx.variant {
            Variant::Plugin(info) => {
                let version = ctx.require_version()?;
                let entry = entry_point.ok_or_else(|| AssembleError::NoEntryPoint {
                    unit: ctx.name().to_string(),
                })?;
                Ok(Some(PackageManifest::Plugin(PluginManifest {
                    name: ctx.name().to_string(),
                    version: version.to_string(),
                    plugin_class: entry.class_name.clone(),
                    changelog: info.changelog.clone().unwrap_or_default(),
                    description: ctx.project.description.clone().unwrap_or_default(),
                    authors: info.authors.clone(),
                    custom_updater_url: info.custom_updater_url.clone(),
                    load_resources: entry.load_resources,
                    requires_restart: entry.requires_restart,
                })))
            }
            Variant::Core { platform_version } => {
                let version = ctx.require_version()?;
                Ok(Some(PackageManifest::Core(CoreManifest {
                    version: version.to_string(),
                    reddit_version_code: *platform_version,
                })))
            }
            Variant::Injector | Variant::Regular => Ok(None),
        }
    }

    /// Build the package for this unit. Regular units produce nothing.
    pub fn assemble(
        &self,
        inputs: AssembleInputs<'_>,
    ) -> Result<Option<PackageArtifact>, AssembleError> {
        let ctx = self.ctx;
        match &ctx.variant {
            Variant::Regular => Ok(None),
            Variant::Injector => self.assemble_injector().map(Some),
            Variant::Plugin(_) | Variant::Core { .. } => {
                // Validates the version before anything touches the disk.
                let Some(manifest) = self.manifest(inputs.entry_point)? else {
                    return Ok(None);
                };
                let dex = inputs
                    .dex
                    .ok_or_else(|| AssembleError::MissingDex(ctx.paths.dex_dir()))?;

                let path = ctx.package_file()?;
                package::write_package(&path, &manifest, &dex.dex_file)?;
                merge_resources(&path, &ctx.paths.resource_apk)?;

                info!("Made {} package {}", ctx.variant.kind(), path.display());
                Ok(Some(PackageArtifact::from_path(path)))
            }
        }
    }

    /// Fold late resource output into an already made package.
    pub fn merge_resources(&self) -> Result<Option<PackageArtifact>, AssembleError> {
        if !self.ctx.variant.packages_resources() {
            return Ok(None);
        }
        let path = self.ctx.package_file()?;
        if !path.is_file() {
            return Err(AssembleError::File {
                path,
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        if merge_resources(&path, &self.ctx.paths.resource_apk)? {
            info!("Merged resources into {}", path.display());
        }
        Ok(Some(PackageArtifact::from_path(path)))
    }

    fn assemble_injector(&self) -> Result<PackageArtifact, AssembleError> {
        let ctx = self.ctx;
        let host_apk = ctx
            .paths
            .host_apk
            .as_ref()
            .ok_or(AssembleError::HostApkNotConfigured)?;
        if !host_apk.is_file() {
            return Err(AssembleError::MissingHostApk(host_apk.clone()));
        }

        let staging = ctx.paths.injector_staging_dir();
        injector::extract(host_apk, &staging)?;

        let path = ctx.package_file()?;
        injector::archive(&staging, &path)?;

        info!("Made injector package {}", path.display());
        Ok(PackageArtifact::from_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;
    use vanced_api::{Author, PluginInfo, VancedError};
    use zip::ZipArchive;

    fn plugin_ctx(dir: &Path, version: Option<&str>) -> BuildContext {
        let info = PluginInfo {
            authors: vec![Author::new("someone")],
            changelog: Some("# 1.0.0\nFirst".to_string()),
            custom_updater_url: None,
        };
        BuildContext::for_project("Foo", version, Variant::Plugin(info), dir)
    }

    fn dex(dir: &Path) -> DexArtifact {
        let output_dir = dir.join("build/intermediates/dex");
        std::fs::create_dir_all(&output_dir).unwrap();
        std::fs::write(output_dir.join("classes.dex"), b"dex\n035\0").unwrap();
        DexArtifact::existing(&output_dir).unwrap()
    }

    fn read_manifest(path: &Path) -> serde_json::Value {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let entry = archive.by_name("manifest.json").unwrap();
        serde_json::from_reader(entry).unwrap()
    }

    #[test]
    fn test_plugin_package() {
        let dir = tempdir().unwrap();
        let ctx = plugin_ctx(dir.path(), Some("1.0.0"));
        let dex = dex(dir.path());
        let entry = EntryPoint {
            class_name: "com.example.Foo".to_string(),
            load_resources: false,
            requires_restart: true,
        };

        let artifact = Assembler::new(&ctx)
            .assemble(AssembleInputs {
                dex: Some(&dex),
                entry_point: Some(&entry),
            })
            .unwrap()
            .unwrap();

        assert_eq!(artifact.name, "Foo.zip");
        assert_eq!(artifact.dir(), Some(dir.path().join("build").as_path()));
        let manifest = read_manifest(&artifact.path);
        assert_eq!(manifest["name"], "Foo");
        assert_eq!(manifest["version"], "1.0.0");
        assert_eq!(manifest["pluginClass"], "com.example.Foo");
        assert_eq!(manifest["requiresRestart"], true);
        assert_eq!(manifest["changelog"], "# 1.0.0\nFirst");
        assert_eq!(manifest["description"], "");
    }

    #[test]
    fn test_unset_version_writes_nothing() {
        let dir = tempdir().unwrap();
        let dex = dex(dir.path());
        let entry = EntryPoint::new("com.example.Foo");

        for version in [None, Some(""), Some("unspecified")] {
            let ctx = plugin_ctx(dir.path(), version);
            let err = Assembler::new(&ctx)
                .assemble(AssembleInputs {
                    dex: Some(&dex),
                    entry_point: Some(&entry),
                })
                .unwrap_err();
            assert!(matches!(
                err,
                AssembleError::Unit(VancedError::UnsetVersion { .. })
            ));
        }
        assert!(!dir.path().join("build/Foo.zip").exists());
    }

    #[test]
    fn test_core_package_and_version() {
        let dir = tempdir().unwrap();
        let dex = dex(dir.path());
        let ctx = BuildContext::for_project(
            "Core",
            Some("2.1.0"),
            Variant::Core {
                platform_version: 2210301,
            },
            dir.path(),
        );

        let artifact = Assembler::new(&ctx)
            .assemble(AssembleInputs {
                dex: Some(&dex),
                entry_point: None,
            })
            .unwrap()
            .unwrap();

        let manifest = read_manifest(&artifact.path);
        assert_eq!(manifest["redditVersionCode"], 2210301);

        let unversioned = BuildContext::for_project(
            "Core",
            None,
            Variant::Core {
                platform_version: 1,
            },
            dir.path(),
        );
        assert!(Assembler::new(&unversioned).manifest(None).is_err());
    }

    #[test]
    fn test_plugin_without_entry_point() {
        let dir = tempdir().unwrap();
        let ctx = plugin_ctx(dir.path(), Some("1.0.0"));
        let err = Assembler::new(&ctx).manifest(None).unwrap_err();
        assert!(matches!(err, AssembleError::NoEntryPoint { .. }));
    }

    #[test]
    fn test_regular_is_noop() {
        let dir = tempdir().unwrap();
        let ctx = BuildContext::for_project("Lib", None, Variant::Regular, dir.path());
        assert!(
            Assembler::new(&ctx)
                .assemble(AssembleInputs::default())
                .unwrap()
                .is_none()
        );
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_injector_requires_host_apk() {
        let dir = tempdir().unwrap();
        let mut ctx = BuildContext::for_project("Injector", None, Variant::Injector, dir.path());

        let err = Assembler::new(&ctx)
            .assemble(AssembleInputs::default())
            .unwrap_err();
        assert!(matches!(err, AssembleError::HostApkNotConfigured));

        ctx.paths.host_apk = Some(dir.path().join("reddit.apk"));
        let err = Assembler::new(&ctx)
            .assemble(AssembleInputs::default())
            .unwrap_err();
        assert!(err.to_string().contains("reddit.apk"));
        assert!(!dir.path().join("build/injector.zip").exists());
    }

    #[test]
    fn test_late_resource_merge() {
        let dir = tempdir().unwrap();
        let ctx = plugin_ctx(dir.path(), Some("1.0.0"));
        let dex = dex(dir.path());
        let entry = EntryPoint::new("com.example.Foo");
        let assembler = Assembler::new(&ctx);
        assembler
            .assemble(AssembleInputs {
                dex: Some(&dex),
                entry_point: Some(&entry),
            })
            .unwrap();

        {
            use std::io::Write;
            let mut zip =
                zip::ZipWriter::new(File::create(&ctx.paths.resource_apk).unwrap());
            zip.start_file("resources.arsc", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"arsc").unwrap();
            zip.finish().unwrap();
        }

        let artifact = assembler.merge_resources().unwrap().unwrap();
        let mut archive = ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        assert!(archive.by_name("resources.arsc").is_ok());
    }
}
