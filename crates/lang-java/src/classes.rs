//! Collection of compiled classes handed over by the upstream compiler.
//!
//! Inputs are compiler output directories (walked for `*.class`) or jar
//! archives (every `*.class` entry). The set is read once and never mutated.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

#[derive(Debug, thiserror::Error)]
pub enum ClassSetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Where a class blob was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassOrigin {
    File(PathBuf),
    Archive { archive: PathBuf, entry: String },
}

impl ClassOrigin {
    /// The path a dex backend accepts as input for this class.
    pub fn input_path(&self) -> &Path {
        match self {
            ClassOrigin::File(path) => path,
            ClassOrigin::Archive { archive, .. } => archive,
        }
    }
}

impl std::fmt::Display for ClassOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassOrigin::File(path) => write!(f, "{}", path.display()),
            ClassOrigin::Archive { archive, entry } => {
                write!(f, "{}!/{}", archive.display(), entry)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassBlob {
    pub origin: ClassOrigin,
    pub bytes: Vec<u8>,
}

impl ClassBlob {
    pub fn new(origin: ClassOrigin, bytes: Vec<u8>) -> Self {
        Self { origin, bytes }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompiledClassSet {
    blobs: Vec<ClassBlob>,
}

impl CompiledClassSet {
    /// Load every class reachable from the given roots, in a stable order.
    /// Roots that do not exist contribute nothing.
    pub fn from_roots(roots: &[PathBuf]) -> Result<Self, ClassSetError> {
        let mut blobs = Vec::new();

        for root in roots {
            if root.is_dir() {
                Self::collect_dir(root, &mut blobs)?;
            } else if root.is_file() && is_archive(root) {
                Self::collect_archive(root, &mut blobs)?;
            } else if root.is_file() && is_class_file(root) {
                let bytes = std::fs::read(root).map_err(|source| ClassSetError::Io {
                    path: root.clone(),
                    source,
                })?;
                blobs.push(ClassBlob::new(ClassOrigin::File(root.clone()), bytes));
            } else {
                debug!("Skipping missing class root {}", root.display());
            }
        }

        debug!("Loaded {} compiled classes from {} roots", blobs.len(), roots.len());
        Ok(Self { blobs })
    }

    pub fn from_blobs(blobs: Vec<ClassBlob>) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &[ClassBlob] {
        &self.blobs
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Distinct input paths (class files and archives) in first-seen order.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        let mut seen = std::collections::HashSet::new();
        self.blobs
            .iter()
            .map(|blob| blob.origin.input_path())
            .filter(|path| seen.insert(path.to_path_buf()))
            .map(Path::to_path_buf)
            .collect()
    }

    fn collect_dir(root: &Path, blobs: &mut Vec<ClassBlob>) -> Result<(), ClassSetError> {
        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_class_file(e.path()));

        for entry in entries {
            let path = entry.path().to_path_buf();
            let bytes = std::fs::read(&path).map_err(|source| ClassSetError::Io {
                path: path.clone(),
                source,
            })?;
            blobs.push(ClassBlob::new(ClassOrigin::File(path), bytes));
        }
        Ok(())
    }

    fn collect_archive(path: &Path, blobs: &mut Vec<ClassBlob>) -> Result<(), ClassSetError> {
        let archive_err = |source| ClassSetError::Archive {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(|source| ClassSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file).map_err(archive_err)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(archive_err)?;
            let name = entry.name().to_string();
            if entry.is_dir() || !name.ends_with(".class") || name.starts_with("META-INF/") {
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|source| ClassSetError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            blobs.push(ClassBlob::new(
                ClassOrigin::Archive {
                    archive: path.to_path_buf(),
                    entry: name,
                },
                bytes,
            ));
        }
        Ok(())
    }
}

fn is_class_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("class")
}

fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jar") | Some("zip")
    )
}
