mod build;
mod deploy;
mod devices;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vanced_api::BuildContext;
use vanced_core::{Overrides, load_context};

#[derive(Parser)]
#[command(
    name = "vanced",
    version,
    about = "Build and deploy RedditVanced plugins, core and injector packages",
    long_about = "Compiles a build unit's classes to dex, packages them the way its variant \
                  requires (plugin, core or injector) and pushes the result to an attached \
                  Android device over adb."
)]
pub struct Cli {
    /// Build unit directory containing vanced.json. Defaults to the current directory.
    #[arg(long, global = true, value_name = "PROJECT_PATH")]
    pub project: Option<PathBuf>,

    /// Android SDK root
    #[arg(long, global = true, env = "ANDROID_HOME", value_name = "SDK_PATH")]
    pub android_sdk: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert compiled classes to dex and locate the plugin entry point
    #[command(
        name = "compile-dex",
        long_about = "Runs d8 over the unit's compiled classes into build/intermediates/dex. \
                      For plugins the entry class annotated with @RedditVancedPlugin is recorded \
                      in build/intermediates/pluginClass.json for a later `make`."
    )]
    CompileDex,
    /// Package the output of compile-dex
    #[command(
        long_about = "Writes build/<name>.zip (plugin, core) with manifest.json, classes.dex and \
                      packed resources, or build/injector.zip with the native libraries and dex \
                      files of the host package."
    )]
    Make,
    /// Merge packed resources into an already made package
    MergeResources,
    /// compile-dex followed by make
    Build,
    /// Build the package and push it to the single attached device
    #[command(
        long_about = "Builds the unit, pushes the package under /storage/emulated/0/RedditVanced/ \
                      and restarts Reddit unless the unit is the injector. Exactly one device must \
                      be attached and ready."
    )]
    Deploy {
        /// Start the app waiting for a debugger to attach
        #[arg(long)]
        wait_for_debugger: bool,
        /// Push the existing package without building first
        #[arg(long)]
        skip_build: bool,
    },
    /// Delete the unit's package from the attached device
    Uninstall,
    /// List devices known to the adb server
    Devices,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _guard = vanced_runtime::init_logging("cli", true);

    if let Commands::Devices = cli.command {
        return devices::run(cli.android_sdk);
    }

    let ctx = load_unit(cli.project, cli.android_sdk)?;
    match cli.command {
        Commands::CompileDex => build::compile_dex(&ctx),
        Commands::Make => build::make(&ctx),
        Commands::MergeResources => build::merge_resources(&ctx),
        Commands::Build => build::build(&ctx),
        Commands::Deploy {
            wait_for_debugger,
            skip_build,
        } => deploy::deploy(&ctx, wait_for_debugger, skip_build),
        Commands::Uninstall => deploy::uninstall(&ctx),
        Commands::Devices => Ok(()),
    }
}

fn load_unit(
    project: Option<PathBuf>,
    android_sdk: Option<PathBuf>,
) -> Result<BuildContext, Box<dyn std::error::Error>> {
    let project = match project {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    Ok(load_context(&project, &Overrides { android_sdk })?)
}
