//! Mutation capabilities: how a single tag change reaches a registry

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use promoter_core::{PromotionRequest, RegInvImage, TagOp};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{debug, trace};

/// Performs one tag mutation against the destination registry
#[async_trait]
pub trait Mutator: Send + Sync {
    /// Apply the request; an error is recorded against this request only
    async fn execute(&self, request: &PromotionRequest) -> Result<()>;
}

/// Mutates Google Container Registry / Artifact Registry tags through `gcloud`
#[derive(Debug, Clone)]
pub struct GcloudMutator {
    gcloud_path: PathBuf,
    service_account: Option<String>,
}

impl GcloudMutator {
    /// Create a mutator using the `gcloud` binary found in PATH
    ///
    /// # Errors
    /// Returns an error if gcloud is not found in PATH
    pub fn new(service_account: Option<String>) -> Result<Self> {
        let gcloud_path = which::which("gcloud").context(
            "gcloud not found in PATH. Install from: https://cloud.google.com/sdk/docs/install",
        )?;

        debug!("Found gcloud at: {:?}", gcloud_path);

        Ok(Self::with_path(gcloud_path, service_account))
    }

    /// Create a mutator with an explicit gcloud binary
    pub fn with_path(gcloud_path: impl Into<PathBuf>, service_account: Option<String>) -> Self {
        Self {
            gcloud_path: gcloud_path.into(),
            service_account,
        }
    }

    /// Arguments passed to gcloud for a request.
    ///
    /// `add-tag` overwrites an existing tag, so it serves both Add and Move.
    pub fn command_args(&self, request: &PromotionRequest) -> Vec<String> {
        let mut args = vec!["container".to_string(), "images".to_string()];
        match request.tag_op {
            TagOp::Add | TagOp::Move => {
                args.push("add-tag".to_string());
                args.push("--quiet".to_string());
                args.push(request.src_ref());
                args.push(request.dest_ref());
            }
            TagOp::Delete => {
                args.push("untag".to_string());
                args.push("--quiet".to_string());
                args.push(request.dest_ref());
            }
        }
        if let Some(account) = &self.service_account {
            args.push(format!("--account={}", account));
        }
        args
    }
}

#[async_trait]
impl Mutator for GcloudMutator {
    async fn execute(&self, request: &PromotionRequest) -> Result<()> {
        let args = self.command_args(request);
        trace!("Running: {:?} {:?}", self.gcloud_path, args);

        let output = Command::new(&self.gcloud_path)
            .args(&args)
            .output()
            .await
            .context("Failed to execute gcloud")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "gcloud exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        debug!("Applied {}", request);
        Ok(())
    }
}

/// An in-memory destination registry.
///
/// Requests are applied to a guarded inventory, which makes it possible to
/// check what a registry would look like after a promotion.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inventory: Mutex<RegInvImage>,
    calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new(inventory: RegInvImage) -> Self {
        Self {
            inventory: Mutex::new(inventory),
            calls: AtomicUsize::new(0),
        }
    }

    /// Current registry contents
    pub fn snapshot(&self) -> Result<RegInvImage> {
        self.inventory
            .lock()
            .map(|inv| inv.clone())
            .map_err(|_| anyhow!("registry lock poisoned"))
    }

    /// Number of mutations performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mutator for MemoryRegistry {
    async fn execute(&self, request: &PromotionRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut inventory = self
            .inventory
            .lock()
            .map_err(|_| anyhow!("registry lock poisoned"))?;
        inventory.apply(request);
        Ok(())
    }
}
