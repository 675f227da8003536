//! Stage orchestration for one build unit.
//!
//! `compile-dex` loads the compiled classes once and hands the same read-only
//! set to the entry-point scan and the dex compiler, which run side by side.
//! `make` can run in a separate invocation: it picks the dex and the
//! recorded entry point back up from the intermediates directory.

use crate::assemble::{AssembleInputs, Assembler, PackageArtifact};
use crate::dex::{DexArtifact, DexBackend, DexCompiler, DexParameters};
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vanced_api::{BuildContext, EntryPoint};
use vanced_java::{CompiledClassSet, EntryPointScanner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub dex: DexArtifact,
    /// Only set for plugins.
    pub entry_point: Option<EntryPoint>,
}

pub struct Pipeline<B> {
    compiler: DexCompiler<B>,
    scanner: EntryPointScanner,
    boot_classpath: Vec<PathBuf>,
}

impl<B: DexBackend> Pipeline<B> {
    pub fn new(backend: B, boot_classpath: Vec<PathBuf>) -> Self {
        Self {
            compiler: DexCompiler::new(backend),
            scanner: EntryPointScanner::new(),
            boot_classpath,
        }
    }

    pub fn with_scanner(mut self, scanner: EntryPointScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn compiler(&self) -> &DexCompiler<B> {
        &self.compiler
    }

    /// Convert the unit's classes to dex and, for plugins, find the entry point.
    pub fn compile_dex(&self, ctx: &BuildContext) -> Result<Option<CompileOutcome>> {
        if !ctx.variant.packages_resources() {
            // Regular units have no package; the injector ships the host's dex.
            debug!("Skipping compile-dex for {} unit {}", ctx.variant.kind(), ctx.name());
            return Ok(None);
        }

        // Until this run succeeds, `make` must not find an earlier record.
        let entry_point_file = ctx.paths.entry_point_file();
        record_entry_point(&entry_point_file, None)?;

        let classes = CompiledClassSet::from_roots(&ctx.paths.class_dirs)?;
        let params = DexParameters::for_unit(ctx.android.min_sdk, self.boot_classpath.clone());
        let output_dir = ctx.paths.dex_dir();

        let (entry_point, dex) = if ctx.variant.scans_entry_point() {
            let (scanned, compiled) = rayon::join(
                || self.scanner.scan(&classes),
                || self.compiler.compile(&classes, &params, &output_dir),
            );
            match scanned {
                Ok(entry) => (Some(entry), compiled?),
                Err(e) => {
                    if let Ok(dex) = &compiled {
                        discard_dex(dex);
                    }
                    return Err(e.into());
                }
            }
        } else {
            (None, self.compiler.compile(&classes, &params, &output_dir)?)
        };

        record_entry_point(&entry_point_file, entry_point.as_ref())?;
        info!("Compiled dex for {}", ctx.name());

        Ok(Some(CompileOutcome { dex, entry_point }))
    }

    /// Assemble from what a previous `compile-dex` left on disk.
    pub fn make(&self, ctx: &BuildContext) -> Result<Option<PackageArtifact>> {
        if !ctx.variant.runs_pipeline() {
            debug!("Skipping make for regular unit {}", ctx.name());
            return Ok(None);
        }

        let dex = DexArtifact::existing(&ctx.paths.dex_dir());
        let entry_point = if ctx.variant.scans_entry_point() {
            Some(load_entry_point(&ctx.paths.entry_point_file())?)
        } else {
            None
        };

        let artifact = Assembler::new(ctx).assemble(AssembleInputs {
            dex: dex.as_ref(),
            entry_point: entry_point.as_ref(),
        })?;
        Ok(artifact)
    }

    /// `compile-dex` then `make`.
    pub fn build(&self, ctx: &BuildContext) -> Result<Option<PackageArtifact>> {
        if !ctx.variant.runs_pipeline() {
            debug!("Skipping build for regular unit {}", ctx.name());
            return Ok(None);
        }
        if !ctx.variant.packages_resources() {
            // The injector is cut from the host package, the dex is not used.
            return Ok(Assembler::new(ctx).assemble(AssembleInputs::default())?);
        }

        // Fail on an unset version before spending time on dex conversion.
        ctx.require_version()?;
        let Some(outcome) = self.compile_dex(ctx)? else {
            return Ok(None);
        };
        let artifact = Assembler::new(ctx).assemble(AssembleInputs {
            dex: Some(&outcome.dex),
            entry_point: outcome.entry_point.as_ref(),
        })?;
        Ok(artifact)
    }

    /// Merge freshly produced resources into an existing package.
    pub fn merge_resources(&self, ctx: &BuildContext) -> Result<Option<PackageArtifact>> {
        Ok(Assembler::new(ctx).merge_resources()?)
    }
}

fn record_entry_point(path: &Path, entry_point: Option<&EntryPoint>) -> Result<()> {
    let file_err = |source| PipelineError::File {
        path: path.to_path_buf(),
        source,
    };
    match entry_point {
        Some(entry) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(file_err)?;
            }
            let json = serde_json::to_vec_pretty(entry).map_err(|source| {
                PipelineError::EntryPointRecord {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            std::fs::write(path, json).map_err(file_err)
        }
        None if path.exists() => std::fs::remove_file(path).map_err(file_err),
        None => Ok(()),
    }
}

/// Drop a dex whose companion scan failed, so no half-finished output remains.
fn discard_dex(dex: &DexArtifact) {
    if let Err(e) = std::fs::remove_file(&dex.dex_file) {
        warn!("Failed to remove {}: {}", dex.dex_file.display(), e);
    }
}

fn load_entry_point(path: &Path) -> Result<EntryPoint> {
    if !path.is_file() {
        return Err(PipelineError::MissingEntryPoint(path.to_path_buf()));
    }
    let content = std::fs::read(path).map_err(|source| PipelineError::File {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| PipelineError::EntryPointRecord {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::DexError;
    use tempfile::tempdir;
    use vanced_api::{PluginInfo, Variant};
    use vanced_java::ENTRY_MARKER;
    use vanced_java::fixture::ClassFileBuilder;

    struct StubBackend;

    impl DexBackend for StubBackend {
        fn convert(
            &self,
            _params: &DexParameters,
            _inputs: &[PathBuf],
            output_dir: &Path,
        ) -> std::result::Result<(), DexError> {
            std::fs::write(output_dir.join("classes.dex"), b"dex\n035\0").unwrap();
            Ok(())
        }
    }

    fn write_class(root: &Path, builder: ClassFileBuilder) {
        let path = root.join(builder.relative_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, builder.build()).unwrap();
    }

    fn plugin_unit(dir: &Path) -> BuildContext {
        let classes = dir.join("classes");
        write_class(
            &classes,
            ClassFileBuilder::new("com.example.Foo").annotation(ENTRY_MARKER, false, vec![]),
        );
        write_class(&classes, ClassFileBuilder::new("com.example.Util"));

        let mut ctx = BuildContext::for_project(
            "Foo",
            Some("1.0.0"),
            Variant::Plugin(PluginInfo::default()),
            dir,
        );
        ctx.paths.class_dirs = vec![classes];
        ctx
    }

    #[test]
    fn test_compile_records_entry_point() {
        let dir = tempdir().unwrap();
        let ctx = plugin_unit(dir.path());
        let pipeline = Pipeline::new(StubBackend, Vec::new());

        let outcome = pipeline.compile_dex(&ctx).unwrap().unwrap();

        assert_eq!(outcome.entry_point, Some(EntryPoint::new("com.example.Foo")));
        assert_eq!(
            load_entry_point(&ctx.paths.entry_point_file()).unwrap(),
            EntryPoint::new("com.example.Foo")
        );
    }

    #[test]
    fn test_make_after_compile() {
        let dir = tempdir().unwrap();
        let ctx = plugin_unit(dir.path());
        let pipeline = Pipeline::new(StubBackend, Vec::new());

        pipeline.compile_dex(&ctx).unwrap();
        let artifact = pipeline.make(&ctx).unwrap().unwrap();
        assert_eq!(artifact.path, dir.path().join("build/Foo.zip"));
    }

    #[test]
    fn test_make_without_compile() {
        let dir = tempdir().unwrap();
        let ctx = plugin_unit(dir.path());
        let err = Pipeline::new(StubBackend, Vec::new()).make(&ctx).unwrap_err();
        assert!(matches!(err, PipelineError::MissingEntryPoint(_)));
    }

    #[test]
    fn test_failed_scan_clears_previous_record() {
        let dir = tempdir().unwrap();
        let ctx = plugin_unit(dir.path());
        let pipeline = Pipeline::new(StubBackend, Vec::new());
        pipeline.compile_dex(&ctx).unwrap();

        write_class(
            &ctx.paths.class_dirs[0],
            ClassFileBuilder::new("com.example.Bar").annotation(ENTRY_MARKER, true, vec![]),
        );
        let err = pipeline.compile_dex(&ctx).unwrap_err();
        assert!(err.to_string().contains("com.example.Bar and com.example.Foo"));

        assert!(!ctx.paths.entry_point_file().exists());
        assert!(DexArtifact::existing(&ctx.paths.dex_dir()).is_none());
        assert!(matches!(
            pipeline.make(&ctx).unwrap_err(),
            PipelineError::MissingEntryPoint(_)
        ));
    }

    #[test]
    fn test_build_checks_version_first() {
        let dir = tempdir().unwrap();
        let mut ctx = plugin_unit(dir.path());
        ctx.project.version = None;

        let err = Pipeline::new(StubBackend, Vec::new()).build(&ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Unit(_)));
        assert!(!ctx.paths.dex_dir().exists());
    }

    #[test]
    fn test_regular_unit_is_untouched() {
        let dir = tempdir().unwrap();
        let mut ctx = plugin_unit(dir.path());
        ctx.variant = Variant::Regular;
        let pipeline = Pipeline::new(StubBackend, Vec::new());

        assert!(pipeline.compile_dex(&ctx).unwrap().is_none());
        assert!(pipeline.build(&ctx).unwrap().is_none());
        assert!(!ctx.paths.build_dir.exists());
    }

    #[test]
    fn test_injector_compiles_nothing() {
        let dir = tempdir().unwrap();
        let mut ctx = plugin_unit(dir.path());
        ctx.variant = Variant::Injector;

        let outcome = Pipeline::new(StubBackend, Vec::new()).compile_dex(&ctx).unwrap();
        assert!(outcome.is_none());
        assert!(!ctx.paths.dex_dir().exists());
    }

    #[test]
    fn test_core_does_not_scan() {
        let dir = tempdir().unwrap();
        let mut ctx = plugin_unit(dir.path());
        ctx.variant = Variant::Core {
            platform_version: 1,
        };
        // Stale record from when the unit was a plugin.
        std::fs::create_dir_all(ctx.paths.intermediates()).unwrap();
        std::fs::write(ctx.paths.entry_point_file(), b"{}").unwrap();

        let outcome = Pipeline::new(StubBackend, Vec::new())
            .compile_dex(&ctx)
            .unwrap()
            .unwrap();
        assert!(outcome.entry_point.is_none());
        assert!(!ctx.paths.entry_point_file().exists());
    }
}
