use vanced_api::BuildContext;
use vanced_bridge::{AdbClient, Deployer};
use vanced_core::{AndroidSdk, D8Backend, Pipeline, SdkError};

const D8_ON_PATH: &str = "d8";

/// Pipeline for a build unit, wired to the SDK's `d8` and platform jar.
///
/// The SDK comes from the unit's settings, else `ANDROID_HOME`. Units that
/// never convert classes get a pipeline without looking the SDK up at all.
pub fn build_default_pipeline(ctx: &BuildContext) -> Result<Pipeline<D8Backend>, SdkError> {
    if !ctx.variant.packages_resources() {
        // Injector and regular units never reach d8, so no SDK is required.
        tracing::debug!("No dex toolchain needed for {}", ctx.name());
        return Ok(Pipeline::new(D8Backend::new(D8_ON_PATH), Vec::new()));
    }
    let sdk = AndroidSdk::locate(&ctx.android)?;
    let d8 = sdk.d8()?;
    let boot_classpath = sdk.boot_classpath(ctx.android.compile_sdk)?;
    tracing::debug!(
        "Using d8 at {} against {:?}",
        d8.display(),
        boot_classpath
    );
    Ok(Pipeline::new(D8Backend::new(d8), boot_classpath))
}

/// Deployer talking to the local adb server.
///
/// Without a usable SDK the server is expected to be running already.
pub fn build_default_deployer(ctx: &BuildContext) -> Deployer<AdbClient> {
    let adb = match AndroidSdk::locate(&ctx.android) {
        Ok(sdk) => Some(sdk.adb()),
        Err(e) => {
            tracing::warn!("Cannot start the adb server: {}", e);
            None
        }
    };
    Deployer::new(AdbClient::from_env(adb))
}

/// Installs the `~/.vanced/logs/<component>.log` writer, echoing to stderr
/// when `verbose`. Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(component: &str, verbose: bool) -> Option<impl Drop> {
    Some(vanced_core::logging::init_logging(component, verbose))
}
