use tracing::info;
use vanced_api::BuildContext;
use vanced_core::PackageArtifact;

type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn compile_dex(ctx: &BuildContext) -> CliResult {
    let pipeline = vanced_runtime::build_default_pipeline(ctx)?;

    info!("Compiling {} to dex...", ctx.name());
    match pipeline.compile_dex(ctx)? {
        Some(outcome) => {
            info!("Wrote {}", outcome.dex.dex_file.display());
            if let Some(entry) = outcome.entry_point {
                info!("Entry point: {}", entry.class_name);
            }
        }
        None => info!("Nothing to compile for {}", ctx.name()),
    }
    Ok(())
}

pub fn make(ctx: &BuildContext) -> CliResult {
    let pipeline = vanced_runtime::build_default_pipeline(ctx)?;
    report(ctx, pipeline.make(ctx)?);
    Ok(())
}

pub fn build(ctx: &BuildContext) -> CliResult {
    let pipeline = vanced_runtime::build_default_pipeline(ctx)?;

    info!("Building {}...", ctx.name());
    report(ctx, pipeline.build(ctx)?);
    Ok(())
}

pub fn merge_resources(ctx: &BuildContext) -> CliResult {
    let pipeline = vanced_runtime::build_default_pipeline(ctx)?;
    report(ctx, pipeline.merge_resources(ctx)?);
    Ok(())
}

fn report(ctx: &BuildContext, artifact: Option<PackageArtifact>) {
    match artifact {
        Some(artifact) => {
            info!("Package ready");
            println!("{}", artifact.path.display());
        }
        None => info!("{} produces no package", ctx.name()),
    }
}
