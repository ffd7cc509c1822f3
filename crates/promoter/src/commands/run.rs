//! Run command: reconcile and execute

use anyhow::Result;
use camino::Utf8Path;
use promoter_engine::{
    promote, GcloudMutator, ManifestReconciler, MemoryRegistry, Mutator, RequestExecutor,
};
use std::sync::Arc;
use tracing::warn;

use super::{load_config, load_sources};
use crate::cli::RunArgs;
use crate::output;

pub async fn run(args: RunArgs, config_path: Option<&Utf8Path>, verbosity: u8) -> Result<()> {
    let mut config = load_config(config_path, verbosity)?;
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.dry_run |= args.dry_run;
    config.delete_extra_tags |= args.source.delete_extra_tags;

    let (manifest, ctx) = load_sources(&args.source, &config)?;

    output::header(if ctx.dry_run {
        "Promotion (dry run)"
    } else {
        "Promotion"
    });
    output::kv("source", manifest.registries.src.as_str());
    output::kv("destination", manifest.registries.dest.as_str());
    output::kv("threads", &ctx.threads.to_string());

    let dest = ctx.registry_inventory(&manifest.registries.dest);

    // A dry run never reaches the mutator, so it does not need gcloud
    let mutator: Arc<dyn Mutator> = if ctx.dry_run {
        Arc::new(MemoryRegistry::new(dest))
    } else {
        Arc::new(GcloudMutator::new(manifest.service_account.clone())?)
    };

    let executor = RequestExecutor::new(&ctx, mutator)?;
    let handle = executor.cancellation_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight requests");
            handle.cancel();
        }
    });

    let report = promote(&ctx, &ManifestReconciler::new(manifest), &executor).await;
    interrupt.abort();
    let report = report?;

    if report.total() == 0 {
        output::success("Destination already matches the manifest");
        return Ok(());
    }
    if let Some(captured) = report.captured() {
        output::header("Captured requests");
        output::captured_table(captured);
    }
    output::report(&report);

    report.ensure_success()?;
    Ok(())
}
