//! CLI command implementations

pub mod plan;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use camino::Utf8Path;
use promoter_core::{Manifest, MasterInventory, SyncConfig};
use promoter_engine::SyncContext;

use crate::cli::SourceArgs;

/// Resolve configuration; CLI flags win over file and environment
fn load_config(config_path: Option<&Utf8Path>, verbosity: u8) -> Result<SyncConfig> {
    let mut config = SyncConfig::load(config_path).context("Failed to load configuration")?;
    config.verbosity = verbosity;
    Ok(config)
}

/// Load the manifest and build a context holding the inventory snapshot
fn load_sources(source: &SourceArgs, config: &SyncConfig) -> Result<(Manifest, SyncContext)> {
    let manifest = Manifest::load(&source.manifest)
        .with_context(|| format!("Failed to load manifest {}", source.manifest))?;
    let inventory = MasterInventory::load(&source.inventory)
        .with_context(|| format!("Failed to load inventory {}", source.inventory))?;

    let ctx = SyncContext::new(config)?.with_inventory(inventory);
    Ok((manifest, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ValidateArgs;
    use camino::Utf8PathBuf;
    use promoter_core::{ImageName, RegistryName};
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
registries:
  src: gcr.io/staging
  dest: gcr.io/prod
images:
  - name: pause
    dmap:
      "sha256:aaa": ["3.1", "latest"]
"#;

    const INVENTORY: &str = r#"
gcr.io/prod:
  pause:
    "sha256:000": ["3.0"]
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("Invalid UTF-8 path");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_sources() {
        let dir = TempDir::new().unwrap();
        let source = SourceArgs {
            manifest: write(&dir, "manifest.yaml", MANIFEST),
            inventory: write(&dir, "inventory.yaml", INVENTORY),
            delete_extra_tags: false,
        };

        let (manifest, ctx) = load_sources(&source, &SyncConfig::default()).unwrap();
        assert_eq!(manifest.images.len(), 1);

        let dest = ctx.registry_inventory(&RegistryName::from("gcr.io/prod"));
        assert!(dest.contains_key(&ImageName::from("pause")));
    }

    #[test]
    fn test_load_sources_missing_inventory() {
        let dir = TempDir::new().unwrap();
        let source = SourceArgs {
            manifest: write(&dir, "manifest.yaml", MANIFEST),
            inventory: Utf8PathBuf::from("/nonexistent/inventory.yaml"),
            delete_extra_tags: false,
        };

        let err = load_sources(&source, &SyncConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to load inventory"));
    }

    #[test]
    fn test_validate_rejects_duplicate_tag() {
        let dir = TempDir::new().unwrap();
        let manifest = write(
            &dir,
            "manifest.yaml",
            r#"
registries:
  src: gcr.io/staging
  dest: gcr.io/prod
images:
  - name: pause
    dmap:
      "sha256:aaa": ["3.1"]
      "sha256:bbb": ["3.1"]
"#,
        );

        let err = validate::run(ValidateArgs {
            manifest,
            inventory: None,
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("claimed by two digests"));
    }

    #[test]
    fn test_validate_accepts_manifest_and_inventory() {
        let dir = TempDir::new().unwrap();
        let args = ValidateArgs {
            manifest: write(&dir, "manifest.yaml", MANIFEST),
            inventory: Some(write(&dir, "inventory.yaml", INVENTORY)),
        };
        assert!(validate::run(args).is_ok());
    }
}
