//! Package variants and the structural rules attached to each of them.
//!
//! A build unit has exactly one [`Variant`], fixed when its configuration is
//! loaded. Every pipeline stage dispatches on it with an exhaustive `match`
//! instead of checking flags at runtime.

use crate::error::VancedResult;
use crate::manifest::Author;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of package a build unit produces, with the data only that kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Variant {
    /// The mod core. Carries the host platform version it targets.
    Core {
        #[serde(rename = "redditVersionCode")]
        platform_version: u32,
    },
    /// The injector stub, extracted from a prebuilt host package.
    Injector,
    /// A user plugin.
    Plugin(PluginInfo),
    /// Compile-time dependency placeholder. Every stage is a no-op.
    Regular,
}

/// Plugin metadata supplied by the build unit (everything except what the
/// entry-point scan discovers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    #[serde(default)]
    pub authors: Vec<Author>,
    /// Entire history of the changelog, markdown supported.
    #[serde(default)]
    pub changelog: Option<String>,
    /// Updater source used instead of the plugin store.
    #[serde(default)]
    pub custom_updater_url: Option<String>,
}

/// Field-less view of [`Variant`], for logging and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Core,
    Injector,
    Plugin,
    Regular,
}

impl Variant {
    pub fn kind(&self) -> VariantKind {
        match self {
            Variant::Core { .. } => VariantKind::Core,
            Variant::Injector => VariantKind::Injector,
            Variant::Plugin(_) => VariantKind::Plugin,
            Variant::Regular => VariantKind::Regular,
        }
    }

    /// Whether any pipeline stage does work for this variant.
    pub fn runs_pipeline(&self) -> bool {
        !matches!(self, Variant::Regular)
    }

    /// Whether the package gets a manifest, a dex file and packed resources.
    pub fn packages_resources(&self) -> bool {
        matches!(self, Variant::Core { .. } | Variant::Plugin(_))
    }

    /// Only plugins have an annotated entry point to discover.
    pub fn scans_entry_point(&self) -> bool {
        matches!(self, Variant::Plugin(_))
    }

    /// Whether deploy/uninstall restart the host app afterwards.
    pub fn relaunches_app(&self) -> bool {
        !matches!(self, Variant::Injector)
    }

    /// Absolute on-device path of a package with the given file name.
    pub fn remote_path(&self, artifact_name: &str) -> VancedResult<String> {
        crate::remote::remote_path(self, artifact_name)
    }
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Core => "core",
            VariantKind::Injector => "injector",
            VariantKind::Plugin => "plugin",
            VariantKind::Regular => "regular",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
