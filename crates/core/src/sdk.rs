//! Android SDK toolchain lookup.
//!
//! Only what the pipeline needs: the platform `android.jar` used as boot
//! classpath, the `d8` dexer of the newest build-tools and `adb`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use vanced_api::AndroidSettings;

const SDK_ENV_VARS: &[&str] = &["ANDROID_HOME", "ANDROID_SDK_ROOT"];

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Android SDK not found, pass --android-sdk or set ANDROID_HOME")]
    NotConfigured,
    #[error("Android SDK root {0} is not a directory")]
    InvalidRoot(PathBuf),
    #[error("No build-tools installed in {0}")]
    NoBuildTools(PathBuf),
    #[error("No platform {requested} installed in {root}")]
    NoPlatform { root: PathBuf, requested: String },
    #[error("{tool} not found at {path}")]
    MissingTool { tool: &'static str, path: PathBuf },
    #[error("Failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidSdk {
    root: PathBuf,
}

impl AndroidSdk {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SdkError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SdkError::InvalidRoot(root));
        }
        Ok(Self { root })
    }

    /// Configured root first, then `ANDROID_HOME` and `ANDROID_SDK_ROOT`.
    pub fn locate(settings: &AndroidSettings) -> Result<Self, SdkError> {
        if let Some(root) = &settings.sdk_root {
            return Self::new(root.clone());
        }
        SDK_ENV_VARS
            .iter()
            .find_map(|var| std::env::var_os(var).filter(|v| !v.is_empty()))
            .map(|root| Self::new(PathBuf::from(root)))
            .unwrap_or(Err(SdkError::NotConfigured))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The newest installed `build-tools/<version>` directory.
    pub fn build_tools(&self) -> Result<PathBuf, SdkError> {
        let dir = self.root.join("build-tools");
        let latest = latest_entry(&dir, |_| true)?
            .ok_or_else(|| SdkError::NoBuildTools(self.root.clone()))?;
        debug!("Using build-tools {}", latest);
        Ok(dir.join(latest))
    }

    pub fn d8(&self) -> Result<PathBuf, SdkError> {
        let name = if cfg!(windows) { "d8.bat" } else { "d8" };
        let path = self.build_tools()?.join(name);
        if !path.is_file() {
            return Err(SdkError::MissingTool { tool: "d8", path });
        }
        Ok(path)
    }

    /// `platforms/android-<api>/android.jar`, or the highest installed
    /// platform when no API level is requested.
    pub fn boot_classpath(&self, compile_sdk: Option<u32>) -> Result<Vec<PathBuf>, SdkError> {
        let platforms = self.root.join("platforms");
        let platform = match compile_sdk {
            Some(api) => format!("android-{api}"),
            None => latest_entry(&platforms, |name| name.starts_with("android-"))?.ok_or_else(
                || SdkError::NoPlatform {
                    root: self.root.clone(),
                    requested: "android-*".to_string(),
                },
            )?,
        };

        let jar = platforms.join(&platform).join("android.jar");
        if !jar.is_file() {
            return Err(SdkError::NoPlatform {
                root: self.root.clone(),
                requested: platform,
            });
        }
        Ok(vec![jar])
    }

    /// Path `adb` would have; existence is checked by whoever runs it.
    pub fn adb(&self) -> PathBuf {
        let name = if cfg!(windows) { "adb.exe" } else { "adb" };
        self.root.join("platform-tools").join(name)
    }
}

/// Highest entry of `dir` in natural order, ignoring non-Unicode names.
fn latest_entry(dir: &Path, accept: impl Fn(&str) -> bool) -> Result<Option<String>, SdkError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SdkError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut latest: Option<String> = None;
    for entry in entries {
        let entry = entry.map_err(|source| SdkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !accept(&name) {
            continue;
        }
        latest = match latest {
            Some(current) if cmp_natural(&current, &name) != Ordering::Less => Some(current),
            _ => Some(name),
        };
    }
    Ok(latest)
}

/// Compares digit runs numerically and everything else bytewise, so that
/// `android-9 < android-10` and `30.0.3 < 34.0.0`.
fn cmp_natural(lhs: &str, rhs: &str) -> Ordering {
    let mut a = lhs.as_bytes();
    let mut b = rhs.as_bytes();

    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let da = a.iter().take_while(|c| c.is_ascii_digit()).count();
                let db = b.iter().take_while(|c| c.is_ascii_digit()).count();
                let na = trim_zeros(&a[..da]);
                let nb = trim_zeros(&b[..db]);
                let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(nb));
                if ord != Ordering::Equal {
                    return ord;
                }
                a = &a[da..];
                b = &b[db..];
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(y);
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let start = digits.iter().take_while(|c| **c == b'0').count();
    &digits[start..]
}
