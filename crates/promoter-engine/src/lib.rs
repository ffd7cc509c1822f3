//! Reconciliation engine for the image promoter
//!
//! This crate turns a desired-state [`Manifest`](promoter_core::Manifest) and
//! a live inventory snapshot into tag mutations, and executes them:
//! - [`ManifestReconciler`] computes the ordered Add / Move / Delete requests
//! - [`RequestExecutor`] runs them on a bounded pool of workers, or records
//!   them in dry-run mode
//! - [`Report`] aggregates the per-request results into a verdict
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use promoter_core::{Manifest, MasterInventory, SyncConfig};
//! use promoter_engine::{
//!     promote, GcloudMutator, ManifestReconciler, RequestExecutor, SyncContext,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifest =
//!         Manifest::from_yaml_str(&std::fs::read_to_string("promoter-manifest.yaml")?)?;
//!     let inventory =
//!         MasterInventory::from_yaml_str(&std::fs::read_to_string("inventory.yaml")?)?;
//!
//!     let ctx = SyncContext::new(&SyncConfig::default())?.with_inventory(inventory);
//!     let mutator = Arc::new(GcloudMutator::new(manifest.service_account.clone())?);
//!     let executor = RequestExecutor::new(&ctx, mutator)?;
//!     let report = promote(&ctx, &ManifestReconciler::new(manifest), &executor).await?;
//!
//!     report.ensure_success()?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod mutator;
pub mod reconcile;
pub mod report;

pub use context::SyncContext;
pub use error::{Error, Result};
pub use executor::{CancellationHandle, RequestExecutor};
pub use mutator::{GcloudMutator, MemoryRegistry, Mutator};
pub use reconcile::{reconcile, ManifestReconciler, RequestGenerator};
pub use report::{Report, Verdict};

use tracing::info;

/// Generate the requests for a run and execute them.
///
/// Consistency errors surface here before any request is executed. The
/// executor is prepared by the caller so it can keep a cancellation handle.
pub async fn promote(
    ctx: &SyncContext,
    generator: &dyn RequestGenerator,
    executor: &RequestExecutor,
) -> Result<Report> {
    let requests = generator.generate_requests(ctx)?;
    info!(
        "Generated {} promotion requests ({})",
        requests.len(),
        if ctx.dry_run { "dry run" } else { "live" }
    );

    let report = executor.execute(requests).await?;
    report.log();
    Ok(report)
}
