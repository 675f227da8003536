use crate::build;
use tracing::{info, warn};
use vanced_api::BuildContext;
use vanced_core::PackageArtifact;

pub fn deploy(
    ctx: &BuildContext,
    wait_for_debugger: bool,
    skip_build: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Regular units have no package; fail before spending time on d8.
    let package = PackageArtifact::from_path(ctx.package_file()?);
    if ctx.project.is_template() {
        warn!("Ignoring deploy for Template plugin!");
        return Ok(());
    }

    if !skip_build {
        build::build(ctx)?;
    }
    let bytes = package
        .read()
        .map_err(|e| format!("cannot read {}: {}", package.path.display(), e))?;

    let deployer = vanced_runtime::build_default_deployer(ctx);
    match deployer.deploy(ctx, &package.name, &bytes, wait_for_debugger)? {
        Some(report) => {
            info!(
                "Deployed {} to {}:{}",
                package.name, report.serial, report.remote_path
            );
            if report.launched {
                info!("Restarted Reddit");
            }
        }
        None => info!("Nothing deployed"),
    }
    Ok(())
}

pub fn uninstall(ctx: &BuildContext) -> Result<(), Box<dyn std::error::Error>> {
    let package = PackageArtifact::from_path(ctx.package_file()?);
    let deployer = vanced_runtime::build_default_deployer(ctx);

    let report = deployer.uninstall(ctx, &package.name)?;
    info!("Removed {} from {}", report.remote_path, report.serial);
    Ok(())
}
