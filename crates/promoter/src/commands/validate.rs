//! Validate command: consistency checks only

use anyhow::{Context, Result};
use promoter_core::{Manifest, MasterInventory};

use crate::cli::ValidateArgs;
use crate::output;

pub fn run(args: ValidateArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest))?;

    let tags = manifest
        .to_image_tag()
        .with_context(|| format!("Manifest {} is inconsistent", args.manifest))?;
    output::success(&format!(
        "Manifest {} is valid ({} images, {} tags)",
        args.manifest,
        manifest.images.len(),
        tags.len()
    ));

    if let Some(path) = &args.inventory {
        let inventory = MasterInventory::load(path)
            .with_context(|| format!("Failed to load inventory {}", path))?;
        for (registry, rii) in inventory.iter() {
            let tags = rii
                .to_image_tag()
                .with_context(|| format!("Inventory of {} is inconsistent", registry))?;
            output::success(&format!(
                "Registry {} is valid ({} images, {} tags)",
                registry,
                rii.len(),
                tags.len()
            ));
        }
    }

    Ok(())
}
