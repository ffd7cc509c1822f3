//! Per-run working state

use crate::error::Result;
use promoter_core::{MasterInventory, RegInvImage, RegistryName, SyncConfig};

/// Working state of one reconciliation run.
///
/// Each run starts from an empty inventory. The inventory is filled in by the
/// caller before reconciliation and only read afterwards.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub verbosity: u8,
    pub threads: usize,
    pub delete_extra_tags: bool,
    pub dry_run: bool,
    pub inv: MasterInventory,
}

impl SyncContext {
    /// Create a context from validated configuration
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            verbosity: config.verbosity,
            threads: config.threads,
            delete_extra_tags: config.delete_extra_tags,
            dry_run: config.dry_run,
            inv: MasterInventory::new(),
        })
    }

    /// Replace the inventory snapshot
    pub fn with_inventory(mut self, inv: MasterInventory) -> Self {
        self.inv = inv;
        self
    }

    /// Record the inventory of one registry
    pub fn insert_registry(&mut self, name: RegistryName, rii: RegInvImage) {
        self.inv.insert(name, rii);
    }

    /// Inventory of a registry; a registry missing from the snapshot is empty
    pub fn registry_inventory(&self, name: &RegistryName) -> RegInvImage {
        match self.inv.get(name) {
            Some(rii) => rii.clone(),
            None => {
                tracing::debug!("No inventory for {}, treating it as empty", name);
                RegInvImage::new()
            }
        }
    }
}
