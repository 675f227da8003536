//! Injector packaging: native libraries and dex files lifted out of the
//! prebuilt host application package.

use super::package::{entry_options, write_atomically};
use crate::error::AssembleError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipArchive};

/// Empty file kept in the staging directory so it is never empty. Not archived.
pub(crate) const STAGING_PLACEHOLDER: &str = ".vanced-staging";

/// Entries of the host package that make up the injector.
fn is_injector_entry(name: &str) -> bool {
    name.starts_with("lib/") || name.starts_with("classes")
}

/// Replace the contents of `staging` with the injector entries of `host_apk`.
pub(crate) fn extract(host_apk: &Path, staging: &Path) -> Result<Vec<String>, AssembleError> {
    if staging.exists() {
        std::fs::remove_dir_all(staging).map_err(AssembleError::file(staging))?;
    }
    std::fs::create_dir_all(staging).map_err(AssembleError::file(staging))?;
    let placeholder = staging.join(STAGING_PLACEHOLDER);
    std::fs::write(&placeholder, b"").map_err(AssembleError::file(&placeholder))?;

    let file = File::open(host_apk).map_err(AssembleError::file(host_apk))?;
    let mut archive = ZipArchive::new(file).map_err(AssembleError::archive(host_apk))?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(AssembleError::archive(host_apk))?;
        if entry.is_dir() || !is_injector_entry(entry.name()) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry {} in {}", entry.name(), host_apk.display());
            continue;
        };

        let target = staging.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(AssembleError::file(parent))?;
        }
        let mut out = File::create(&target).map_err(AssembleError::file(&target))?;
        std::io::copy(&mut entry, &mut out).map_err(AssembleError::file(&target))?;
        extracted.push(entry.name().to_string());
    }

    debug!(
        "Extracted {} injector entries from {}",
        extracted.len(),
        host_apk.display()
    );
    Ok(extracted)
}

/// Archive everything under `staging` except the placeholder.
pub(crate) fn archive(staging: &Path, output: &Path) -> Result<(), AssembleError> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry.map_err(|e| AssembleError::File {
            path: staging.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(staging) else {
            continue;
        };
        if relative == Path::new(STAGING_PLACEHOLDER) {
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.path().to_path_buf()));
    }

    let mut contents = Vec::with_capacity(files.len());
    for (name, path) in files {
        let bytes = std::fs::read(&path).map_err(AssembleError::file(&path))?;
        contents.push((name, bytes));
    }

    write_atomically(output, |zip| {
        for (name, bytes) in &contents {
            zip.start_file(name.as_str(), entry_options(CompressionMethod::Deflated))?;
            zip.write_all(bytes)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn host_apk(path: &Path) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for name in [
            "AndroidManifest.xml",
            "classes.dex",
            "lib/arm64-v8a/libx.so",
            "res/drawable/icon.png",
            "META-INF/CERT.RSA",
        ] {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(name.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_entry_filter() {
        assert!(is_injector_entry("lib/x86/libfoo.so"));
        assert!(is_injector_entry("classes7.dex"));
        assert!(!is_injector_entry("resources.arsc"));
        assert!(!is_injector_entry("assets/lib/readme"));
    }

    #[test]
    fn test_extract_replaces_staging() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("host.apk");
        host_apk(&apk);
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("stale.dex"), b"old").unwrap();

        let mut extracted = extract(&apk, &staging).unwrap();
        extracted.sort();

        assert_eq!(extracted, vec!["classes.dex", "lib/arm64-v8a/libx.so"]);
        assert!(!staging.join("stale.dex").exists());
        assert!(staging.join(STAGING_PLACEHOLDER).exists());
    }

    #[test]
    fn test_archive_skips_placeholder() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("host.apk");
        host_apk(&apk);
        let staging = dir.path().join("staging");
        extract(&apk, &staging).unwrap();

        let output = dir.path().join("injector.zip");
        archive(&staging, &output).unwrap();

        let zip = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut names: Vec<_> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["classes.dex", "lib/arm64-v8a/libx.so"]);
    }
}
