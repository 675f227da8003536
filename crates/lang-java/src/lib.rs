//! JVM bytecode inspection for the build pipeline: loading compiled classes,
//! reading class-level annotations and discovering the plugin entry point.

pub mod classes;
pub mod reader;
pub mod scanner;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use classes::{ClassBlob, ClassOrigin, ClassSetError, CompiledClassSet};
pub use reader::{ClassFileReader, ClassMetadata, ClassMetadataReader, ReadError};
pub use scanner::{ENTRY_MARKER, EntryPointScanner, ScanError};
