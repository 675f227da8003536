//! Manifest records written into Plugin and Core packages.
//!
//! Field names follow the JSON schema the on-device loader reads
//! (`pluginClass`, `loadResources`, `redditVersionCode`, ...).

use serde::{Deserialize, Serialize};

/// File name of the manifest entry inside a package.
pub const MANIFEST_ENTRY: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_username: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discord_id: None,
            reddit_username: None,
        }
    }
}

/// What the entry-point scan publishes for a plugin build unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    /// Fully-qualified, dot-separated class name.
    pub class_name: String,
    #[serde(default)]
    pub load_resources: bool,
    #[serde(default)]
    pub requires_restart: bool,
}

impl EntryPoint {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            load_resources: false,
            requires_restart: false,
        }
    }
}

/// Plugin descriptor as serialized into `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub plugin_class: String,
    #[serde(default)]
    pub changelog: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_updater_url: Option<String>,
    #[serde(default)]
    pub load_resources: bool,
    #[serde(default)]
    pub requires_restart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreManifest {
    pub version: String,
    pub reddit_version_code: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageManifest {
    Plugin(PluginManifest),
    Core(CoreManifest),
}

impl PackageManifest {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            PackageManifest::Plugin(m) => serde_json::to_vec(m),
            PackageManifest::Core(m) => serde_json::to_vec(m),
        }
    }
}
