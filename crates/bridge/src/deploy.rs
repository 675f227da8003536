//! Deploy and uninstall flows.
//!
//! Both are linear: resolve the on-device path, pick the device, touch the
//! file, then restart the host app unless the unit is the injector. A failure
//! stops the flow where it is; nothing already done on the device is undone.

use crate::bridge::{DeviceBridge, discover_device};
use crate::error::DeployError;
use crate::shell::ShellResult;
use tracing::{debug, info, warn};
use vanced_api::BuildContext;

/// Activity started after a deploy.
pub const LAUNCH_COMPONENT: &str =
    "com.github.redditvanced/com.reddit.frontpage.main.MainActivity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub serial: String,
    pub remote_path: String,
    pub launched: bool,
}

pub struct Deployer<B> {
    bridge: B,
}

impl<B: DeviceBridge> Deployer<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Push a package to the device. The `Template` unit is never deployed.
    pub fn deploy(
        &self,
        ctx: &BuildContext,
        artifact_name: &str,
        bytes: &[u8],
        wait_for_debugger: bool,
    ) -> Result<Option<DeployReport>, DeployError> {
        if ctx.project.is_template() {
            warn!("Ignoring deploy for Template plugin!");
            return Ok(None);
        }

        let remote_path = ctx.variant.remote_path(artifact_name)?;
        let device = discover_device(&self.bridge)?;

        debug!("Pushing {} bytes to {}", bytes.len(), remote_path);
        self.bridge.push(&device.serial, bytes, &remote_path)?;

        let launched = ctx.variant.relaunches_app();
        if launched {
            self.launch(&device.serial, wait_for_debugger)?;
        }

        info!("Deployed {} to {}", artifact_name, device.serial);
        Ok(Some(DeployReport {
            serial: device.serial,
            remote_path,
            launched,
        }))
    }

    /// Delete a previously deployed package from the device.
    pub fn uninstall(
        &self,
        ctx: &BuildContext,
        artifact_name: &str,
    ) -> Result<DeployReport, DeployError> {
        let remote_path = ctx.variant.remote_path(artifact_name)?;
        let device = discover_device(&self.bridge)?;

        let removed = self.bridge.remove(&device.serial, &remote_path)?;
        check(&device.serial, &format!("rm {remote_path}"), removed)?;

        let launched = ctx.variant.relaunches_app();
        if launched {
            self.launch(&device.serial, false)?;
        }

        info!("Deleted {} from {}", remote_path, device.serial);
        Ok(DeployReport {
            serial: device.serial,
            remote_path,
            launched,
        })
    }

    /// Force-stop and start the host app, optionally waiting for a debugger.
    pub fn launch(&self, serial: &str, wait_for_debugger: bool) -> Result<ShellResult, DeployError> {
        let mut args = vec!["start", "-S", "-n", LAUNCH_COMPONENT];
        if wait_for_debugger {
            args.push("-D");
        }
        let result = self.bridge.exec_shell(serial, "am", &args)?;
        check(serial, &format!("am {}", args.join(" ")), result)
    }
}

fn check(serial: &str, command: &str, result: ShellResult) -> Result<ShellResult, DeployError> {
    if result.succeeded {
        Ok(result)
    } else {
        Err(DeployError::Shell {
            serial: serial.to_string(),
            command: command.to_string(),
            response: result.raw.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceState;
    use crate::fake::{Call, FakeBridge};
    use std::path::Path;
    use vanced_api::{PluginInfo, VancedError, Variant};

    fn ctx(name: &str, variant: Variant) -> BuildContext {
        BuildContext::for_project(name, Some("1.0.0"), variant, Path::new("/work"))
    }

    fn plugin() -> Variant {
        Variant::Plugin(PluginInfo::default())
    }

    fn one_device() -> FakeBridge {
        FakeBridge::new().with_device("emulator-5554", DeviceState::Device)
    }

    #[test]
    fn test_deploy_plugin_and_launch() {
        let deployer = Deployer::new(one_device());
        let report = deployer
            .deploy(&ctx("Foo", plugin()), "Foo.zip", b"PK", false)
            .unwrap()
            .unwrap();

        assert_eq!(report.remote_path, "/storage/emulated/0/RedditVanced/plugins/Foo.zip");
        assert!(report.launched);
        assert_eq!(
            deployer.bridge().pushes(),
            vec![(
                "emulator-5554".to_string(),
                report.remote_path.clone(),
                b"PK".to_vec()
            )]
        );
        assert_eq!(
            deployer.bridge().shell_commands(),
            vec![format!("am start -S -n {LAUNCH_COMPONENT}")]
        );
    }

    #[test]
    fn test_wait_for_debugger_flag() {
        let deployer = Deployer::new(one_device());
        deployer
            .deploy(&ctx("Foo", plugin()), "Foo.zip", b"PK", true)
            .unwrap();
        assert!(deployer.bridge().shell_commands()[0].ends_with(" -D"));
    }

    #[test]
    fn test_injector_is_not_launched() {
        let deployer = Deployer::new(one_device());
        let report = deployer
            .deploy(&ctx("Injector", Variant::Injector), "injector.zip", b"PK", true)
            .unwrap()
            .unwrap();

        assert_eq!(report.remote_path, "/storage/emulated/0/RedditVanced/build/injector.zip");
        assert!(!report.launched);
        assert!(deployer.bridge().shell_commands().is_empty());
    }

    #[test]
    fn test_template_is_skipped() {
        let deployer = Deployer::new(one_device());
        let report = deployer
            .deploy(&ctx("Template", plugin()), "Template.zip", b"PK", false)
            .unwrap();
        assert!(report.is_none());
        assert!(deployer.bridge().calls().is_empty());
    }

    #[test]
    fn test_regular_fails_before_discovery() {
        let deployer = Deployer::new(one_device());
        let err = deployer
            .deploy(&ctx("Lib", Variant::Regular), "Lib.zip", b"PK", false)
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::Unit(VancedError::RegularVariant { .. })
        ));
        assert!(deployer.bridge().calls().is_empty());
    }

    #[test]
    fn test_launch_error_after_push() {
        let bridge = one_device().with_shell_response(
            "am",
            "Starting: Intent { cmp=com.github.redditvanced/... }\nError type 3\n",
        );
        let deployer = Deployer::new(bridge);
        let err = deployer
            .deploy(&ctx("Foo", plugin()), "Foo.zip", b"PK", false)
            .unwrap_err();

        assert!(err.to_string().contains("Error type 3"));
        // The push is not rolled back.
        assert_eq!(deployer.bridge().pushes().len(), 1);
    }

    #[test]
    fn test_push_failure_stops_flow() {
        let deployer = Deployer::new(one_device().failing_push());
        let err = deployer
            .deploy(&ctx("Foo", plugin()), "Foo.zip", b"PK", false)
            .unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
        assert!(deployer.bridge().shell_commands().is_empty());
    }

    #[test]
    fn test_uninstall_core() {
        let deployer = Deployer::new(one_device());
        let core = Variant::Core {
            platform_version: 1,
        };
        let report = deployer.uninstall(&ctx("Core", core), "Core.zip").unwrap();

        assert_eq!(report.remote_path, "/storage/emulated/0/RedditVanced/build/core.zip");
        assert_eq!(
            deployer.bridge().shell_commands(),
            vec![
                "rm /storage/emulated/0/RedditVanced/build/core.zip".to_string(),
                format!("am start -S -n {LAUNCH_COMPONENT}"),
            ]
        );
        assert!(
            !deployer
                .bridge()
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Push { .. }))
        );
    }
}
