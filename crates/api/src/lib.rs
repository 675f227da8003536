pub mod context;
pub mod error;
pub mod manifest;
pub mod remote;
pub mod variant;

// Re-export commonly used types
pub use context::{AndroidSettings, BuildContext, BuildPaths, ProjectInfo};
pub use error::{VancedError, VancedResult};
pub use manifest::{Author, CoreManifest, EntryPoint, PackageManifest, PluginManifest};
pub use remote::{REMOTE_BASE_DIR, remote_path};
pub use variant::{PluginInfo, Variant, VariantKind};
