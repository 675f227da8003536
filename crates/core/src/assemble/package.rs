//! Plugin and Core package archives.
//!
//! Every entry is written with the zip epoch as its timestamp, so the same
//! inputs always give byte-identical packages. Archives are written to a
//! sibling temp file and renamed into place.

use crate::error::AssembleError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use vanced_api::PackageManifest;
use vanced_api::manifest::MANIFEST_ENTRY;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Entry of a resource container that belongs to the host app, never the package.
pub const PLATFORM_MANIFEST: &str = "AndroidManifest.xml";

pub(crate) fn entry_options(method: CompressionMethod) -> SimpleFileOptions {
    let method = match method {
        CompressionMethod::Stored => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    };
    SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(DateTime::default())
}

/// Write `manifest.json` followed by `classes.dex` to `path`.
pub(crate) fn write_package(
    path: &Path,
    manifest: &PackageManifest,
    dex_file: &Path,
) -> Result<(), AssembleError> {
    let manifest = manifest.to_json()?;
    let dex = std::fs::read(dex_file).map_err(AssembleError::file(dex_file))?;
    let dex_name = dex_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| crate::dex::DEX_FILE.to_string());

    write_atomically(path, |zip| {
        zip.start_file(MANIFEST_ENTRY, entry_options(CompressionMethod::Deflated))?;
        zip.write_all(&manifest)?;
        zip.start_file(dex_name.as_str(), entry_options(CompressionMethod::Deflated))?;
        zip.write_all(&dex)?;
        Ok(())
    })
}

/// Merge the entries of a packed resource container into `package`.
///
/// Entries already in the package with the same name are replaced, and the
/// container's `AndroidManifest.xml` is left out. Merging the same container
/// twice yields the same bytes. Returns `false` when there is nothing to merge.
pub fn merge_resources(package: &Path, resource_apk: &Path) -> Result<bool, AssembleError> {
    if !resource_apk.is_file() {
        debug!("No packed resources at {}", resource_apk.display());
        return Ok(false);
    }

    let resources = read_entries(resource_apk, |name| name != PLATFORM_MANIFEST)?;
    let replaced: HashSet<&str> = resources.iter().map(|e| e.name.as_str()).collect();
    let base = read_entries(package, |name| {
        !replaced.contains(name) && name != PLATFORM_MANIFEST
    })?;

    write_atomically(package, |zip| {
        for entry in base.iter().chain(resources.iter()) {
            zip.start_file(entry.name.as_str(), entry_options(entry.method))?;
            zip.write_all(&entry.bytes)?;
        }
        Ok(())
    })?;

    debug!(
        "Merged {} resource entries into {}",
        resources.len(),
        package.display()
    );
    Ok(true)
}

struct Entry {
    name: String,
    method: CompressionMethod,
    bytes: Vec<u8>,
}

fn read_entries(path: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<Entry>, AssembleError> {
    let file = File::open(path).map_err(AssembleError::file(path))?;
    let mut archive = ZipArchive::new(file).map_err(AssembleError::archive(path))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(AssembleError::archive(path))?;
        if entry.is_dir() || !keep(entry.name()) {
            continue;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(AssembleError::file(path))?;
        entries.push(Entry {
            name: entry.name().to_string(),
            method: entry.compression(),
            bytes,
        });
    }
    Ok(entries)
}

/// Build an archive in `<path>.tmp` and move it over `path` once complete.
pub(crate) fn write_atomically(
    path: &Path,
    fill: impl FnOnce(&mut ZipWriter<File>) -> zip::result::ZipResult<()>,
) -> Result<(), AssembleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(AssembleError::file(parent))?;
    }

    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(AssembleError::file(&tmp))?;
    let mut zip = ZipWriter::new(file);

    let written = fill(&mut zip).and_then(|()| zip.finish().map(drop));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(AssembleError::Archive {
            path: path.to_path_buf(),
            source: e,
        });
    }

    std::fs::rename(&tmp, path).map_err(AssembleError::file(path))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vanced_api::CoreManifest;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, bytes) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    fn names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(str::to_string).collect::<Vec<_>>()
    }

    fn core_package(dir: &Path) -> PathBuf {
        let dex = dir.join("classes.dex");
        std::fs::write(&dex, b"dex\n035\0").unwrap();
        let package = dir.join("Core.zip");
        let manifest = PackageManifest::Core(CoreManifest {
            version: "1.0.0".to_string(),
            reddit_version_code: 1,
        });
        write_package(&package, &manifest, &dex).unwrap();
        package
    }

    #[test]
    fn test_package_entry_order() {
        let dir = tempdir().unwrap();
        let package = core_package(dir.path());
        let mut archive = ZipArchive::new(File::open(&package).unwrap()).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "manifest.json");
        assert_eq!(archive.by_index(1).unwrap().name(), "classes.dex");
        assert!(!dir.path().join("Core.zip.tmp").exists());
    }

    #[test]
    fn test_timestamps_are_stripped() {
        let dir = tempdir().unwrap();
        let package = core_package(dir.path());
        let mut archive = ZipArchive::new(File::open(&package).unwrap()).unwrap();
        let modified = archive.by_index(0).unwrap().last_modified();
        assert_eq!(modified, Some(DateTime::default()));
    }

    #[test]
    fn test_merge_skips_platform_manifest() {
        let dir = tempdir().unwrap();
        let package = core_package(dir.path());
        let res = dir.path().join("res.apk");
        write_zip(
            &res,
            &[
                ("AndroidManifest.xml", b"<manifest/>"),
                ("resources.arsc", b"arsc"),
                ("res/layout/main.xml", b"<layout/>"),
            ],
        );

        assert!(merge_resources(&package, &res).unwrap());

        let mut merged = names(&package);
        merged.sort();
        assert_eq!(
            merged,
            vec!["classes.dex", "manifest.json", "res/layout/main.xml", "resources.arsc"]
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let dir = tempdir().unwrap();
        let package = core_package(dir.path());
        let res = dir.path().join("res.apk");
        write_zip(&res, &[("resources.arsc", b"arsc")]);

        merge_resources(&package, &res).unwrap();
        let once = std::fs::read(&package).unwrap();
        merge_resources(&package, &res).unwrap();
        let twice = std::fs::read(&package).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_without_resources() {
        let dir = tempdir().unwrap();
        let package = core_package(dir.path());
        let before = std::fs::read(&package).unwrap();

        assert!(!merge_resources(&package, &dir.path().join("missing.apk")).unwrap());
        assert_eq!(std::fs::read(&package).unwrap(), before);
    }
}
