use crate::error::{VancedError, VancedResult};
use crate::variant::Variant;

/// Root of the mod framework's directory on the device's shared storage.
pub const REMOTE_BASE_DIR: &str = "/storage/emulated/0/RedditVanced";

/// Maps a variant and package file name to its absolute path on the device.
///
/// The regular variant never produces a package, so asking for its path is a
/// caller bug and is reported as an error rather than an empty path.
pub fn remote_path(variant: &Variant, artifact_name: &str) -> VancedResult<String> {
    let relative = match variant {
        Variant::Plugin(_) => {
            if artifact_name.is_empty() || artifact_name.contains('/') {
                return Err(VancedError::InvalidArgument(format!(
                    "plugin artifact name `{artifact_name}` must be a plain file name"
                )));
            }
            format!("plugins/{artifact_name}")
        }
        Variant::Injector => "build/injector.zip".to_string(),
        Variant::Core { .. } => "build/core.zip".to_string(),
        Variant::Regular => {
            return Err(VancedError::RegularVariant {
                operation: "resolve a remote path",
            });
        }
    };
    Ok(format!("{REMOTE_BASE_DIR}/{relative}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::PluginInfo;

    #[test]
    fn test_plugin_path_uses_artifact_name() {
        let path = remote_path(&Variant::Plugin(PluginInfo::default()), "Foo.zip").unwrap();
        assert_eq!(path, format!("{REMOTE_BASE_DIR}/plugins/Foo.zip"));
    }

    #[test]
    fn test_fixed_paths_ignore_artifact_name() {
        assert_eq!(
            remote_path(&Variant::Injector, "whatever.zip").unwrap(),
            format!("{REMOTE_BASE_DIR}/build/injector.zip")
        );
        assert_eq!(
            remote_path(
                &Variant::Core {
                    platform_version: 1
                },
                "Core.zip"
            )
            .unwrap(),
            format!("{REMOTE_BASE_DIR}/build/core.zip")
        );
    }

    #[test]
    fn test_regular_has_no_path() {
        let err = remote_path(&Variant::Regular, "x.zip").unwrap_err();
        assert!(matches!(err, VancedError::RegularVariant { .. }));
    }

    #[test]
    fn test_plugin_name_cannot_escape_directory() {
        let result = remote_path(&Variant::Plugin(PluginInfo::default()), "../core.zip");
        assert!(result.is_err());
    }
}
