//! Plugin entry-point discovery.
//!
//! Every class in the set is read in parallel; the per-class results are then
//! folded by a single reduction that keeps at most one match and turns a
//! second match into [`ScanError::MultipleEntryPoints`]. The outcome therefore
//! does not depend on which worker finishes first.

use crate::classes::{ClassBlob, ClassOrigin, CompiledClassSet};
use crate::reader::{ClassFileReader, ClassMetadataReader, ReadError};
use rayon::prelude::*;
use tracing::{debug, info};
use vanced_api::EntryPoint;

/// Descriptor of the annotation marking a plugin's entry class.
pub const ENTRY_MARKER: &str = "Lcom/github/redditvanced/annotations/RedditVancedPlugin;";

const LOAD_RESOURCES: &str = "loadResources";
const REQUIRES_RESTART: &str = "requiresRestart";

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("No plugin entry point found, missing @{} annotation on the plugin class", display_name(.marker))]
    NoEntryPoint { marker: String },
    #[error("Only 1 active plugin class per project is supported, found multiple entry points: {first} and {second}")]
    MultipleEntryPoints { first: String, second: String },
    #[error("Failed to read class {origin}: {source}")]
    Malformed {
        origin: ClassOrigin,
        #[source]
        source: ReadError,
    },
}

pub struct EntryPointScanner<R = ClassFileReader> {
    reader: R,
    marker: String,
}

impl EntryPointScanner<ClassFileReader> {
    pub fn new() -> Self {
        Self::with_reader(ClassFileReader)
    }
}

impl Default for EntryPointScanner<ClassFileReader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ClassMetadataReader> EntryPointScanner<R> {
    pub fn with_reader(reader: R) -> Self {
        Self {
            reader,
            marker: ENTRY_MARKER.to_string(),
        }
    }

    /// Match a different marker descriptor (e.g. `Lcom/example/Entry;`).
    pub fn with_marker(mut self, descriptor: impl Into<String>) -> Self {
        self.marker = descriptor.into();
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Finds the single class carrying the marker annotation.
    ///
    /// Any unreadable class aborts the scan; skipping it could hide the real
    /// entry point and turn the failure into a misleading "not found".
    pub fn scan(&self, classes: &CompiledClassSet) -> Result<EntryPoint, ScanError> {
        let start = std::time::Instant::now();

        let found = classes
            .blobs()
            .par_iter()
            .map(|blob| self.inspect(blob))
            .try_reduce(|| None, merge_matches)?;

        debug!(
            "Scanned {} classes for {} in {:?}",
            classes.len(),
            self.marker,
            start.elapsed()
        );

        match found {
            Some(entry) => {
                info!("Found plugin entry point {}", entry.class_name);
                Ok(entry)
            }
            None => Err(ScanError::NoEntryPoint {
                marker: self.marker.clone(),
            }),
        }
    }

    fn inspect(&self, blob: &ClassBlob) -> Result<Option<EntryPoint>, ScanError> {
        let metadata = self
            .reader
            .read(&blob.bytes)
            .map_err(|source| ScanError::Malformed {
                origin: blob.origin.clone(),
                source,
            })?;

        Ok(metadata
            .find_annotation(&self.marker)
            .map(|annotation| EntryPoint {
                class_name: metadata.name.clone(),
                load_resources: annotation.flag(LOAD_RESOURCES),
                requires_restart: annotation.flag(REQUIRES_RESTART),
            }))
    }
}

fn merge_matches(
    a: Option<EntryPoint>,
    b: Option<EntryPoint>,
) -> Result<Option<EntryPoint>, ScanError> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let (first, second) = if a.class_name <= b.class_name {
                (a.class_name, b.class_name)
            } else {
                (b.class_name, a.class_name)
            };
            Err(ScanError::MultipleEntryPoints { first, second })
        }
        (a, b) => Ok(a.or(b)),
    }
}

/// `Lcom/example/Marker;` -> `com.example.Marker`
fn display_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .unwrap_or(descriptor)
        .replace('/', ".")
}
