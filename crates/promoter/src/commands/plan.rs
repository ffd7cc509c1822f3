//! Plan command: show the requests without touching the registry

use anyhow::{Context, Result};
use camino::Utf8Path;
use promoter_engine::{ManifestReconciler, MemoryRegistry, RequestExecutor, RequestGenerator};
use std::sync::Arc;

use super::{load_config, load_sources};
use crate::cli::PlanArgs;
use crate::output;

pub async fn run(args: PlanArgs, config_path: Option<&Utf8Path>, verbosity: u8) -> Result<()> {
    let mut config = load_config(config_path, verbosity)?;
    config.delete_extra_tags |= args.source.delete_extra_tags;
    // Simulation applies requests to memory; it must not just capture them
    config.dry_run = false;

    let (manifest, ctx) = load_sources(&args.source, &config)?;
    let dest = ctx.registry_inventory(&manifest.registries.dest);
    let requests = ManifestReconciler::new(manifest).generate_requests(&ctx)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&requests).context("Failed to serialize plan to JSON")?;
        println!("{}", json);
    } else if requests.is_empty() {
        output::success("Destination already matches the manifest");
    } else {
        output::header(&format!("{} requests", requests.len()));
        output::requests_table(&requests);
    }

    if args.simulate {
        let registry = Arc::new(MemoryRegistry::new(dest));
        let report = RequestExecutor::new(&ctx, registry.clone())?
            .execute(requests)
            .await?;
        report.ensure_success()?;

        let after = registry.snapshot()?;
        let yaml =
            serde_yaml_ng::to_string(&after).context("Failed to serialize simulated inventory")?;
        if !args.json {
            output::header("Destination after promotion");
        }
        print!("{}", yaml);
    } else if !args.json {
        output::info("Nothing was executed; use `promoter run` to apply");
    }

    Ok(())
}
