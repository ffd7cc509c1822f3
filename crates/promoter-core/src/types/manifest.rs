//! Manifest model: the declared desired state of a destination registry

use super::inventory::{DigestTags, RegInvImage};
use super::names::{ImageName, RegistryName};
use crate::error::{Error, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;

/// Source and destination registries of a promotion
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistryNames {
    #[serde(default)]
    pub src: RegistryName,
    #[serde(default)]
    pub dest: RegistryName,
}

impl RegistryNames {
    pub fn new(src: impl Into<RegistryName>, dest: impl Into<RegistryName>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

/// An image and the digest-to-tags mapping it should have
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "name")]
    pub image_name: ImageName,
    #[serde(default)]
    pub dmap: DigestTags,
}

/// Desired state of a destination registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    pub registries: RegistryNames,

    /// Identity used when talking to the registries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

impl Manifest {
    /// Parse a manifest from YAML
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let manifest: Self = serde_yaml_ng::from_str(content)?;
        manifest.check_registries()?;
        Ok(manifest)
    }

    /// Load a manifest from a YAML file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        let manifest = Self::from_yaml_str(&content)?;
        tracing::debug!(
            "Loaded manifest with {} images from {}",
            manifest.images.len(),
            path
        );
        Ok(manifest)
    }

    /// The manifest's images in the natural (image, then digest) view.
    ///
    /// An image listed more than once has its digest maps merged.
    pub fn to_reg_inv_image(&self) -> RegInvImage {
        let mut rii = RegInvImage::new();
        for image in &self.images {
            let dmap = rii.entry(image.image_name.clone()).or_default();
            for (digest, tags) in &image.dmap {
                let entry = dmap.entry(digest.clone()).or_default();
                for tag in tags {
                    if !entry.contains(tag) {
                        entry.push(tag.clone());
                    }
                }
            }
        }
        rii
    }

    /// Whether the manifest declares the given image
    pub fn declares(&self, image: &ImageName) -> bool {
        self.images.iter().any(|i| &i.image_name == image)
    }

    fn check_registries(&self) -> Result<()> {
        if self.registries.src.is_empty() {
            return Err(Error::invalid_config("manifest is missing registries.src"));
        }
        if self.registries.dest.is_empty() {
            return Err(Error::invalid_config("manifest is missing registries.dest"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Digest, Tag};

    const MANIFEST: &str = r#"
registries:
  src: gcr.io/staging
  dest: gcr.io/prod
service-account: promoter@example.iam.gserviceaccount.com
images:
  - name: pause
    dmap:
      "sha256:aaa": ["3.1", "latest"]
  - name: etcd
    dmap:
      "sha256:bbb": []
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(manifest.registries.src, RegistryName::from("gcr.io/staging"));
        assert_eq!(manifest.registries.dest, RegistryName::from("gcr.io/prod"));
        assert_eq!(
            manifest.service_account.as_deref(),
            Some("promoter@example.iam.gserviceaccount.com")
        );
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(
            manifest.images[0].dmap[&Digest::from("sha256:aaa")],
            vec![Tag::from("3.1"), Tag::from("latest")]
        );
        assert!(manifest.declares(&ImageName::from("etcd")));
        assert!(!manifest.declares(&ImageName::from("coredns")));
    }

    #[test]
    fn test_missing_dest_is_rejected() {
        let yaml = "registries:\n  src: gcr.io/staging\n";
        assert!(matches!(
            Manifest::from_yaml_str(yaml),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_src_is_rejected() {
        let yaml = "registries:\n  dest: gcr.io/prod\nimages: []\n";
        let err = Manifest::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("registries.src"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promoter-manifest.yaml");
        fs::write(&path, MANIFEST).unwrap();

        let path = camino::Utf8PathBuf::from_path_buf(path).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.images.len(), 2);

        let missing = path.with_file_name("missing.yaml");
        assert!(matches!(
            Manifest::load(&missing),
            Err(Error::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_repeated_image_is_merged() {
        let yaml = r#"
registries: {src: s, dest: d}
images:
  - name: a
    dmap: {"sha256:x": ["v1"]}
  - name: a
    dmap: {"sha256:x": ["v2"], "sha256:y": []}
"#;
        let rii = Manifest::from_yaml_str(yaml).unwrap().to_reg_inv_image();
        let dmap = &rii[&ImageName::from("a")];
        assert_eq!(
            dmap[&Digest::from("sha256:x")],
            vec![Tag::from("v1"), Tag::from("v2")]
        );
        assert!(dmap[&Digest::from("sha256:y")].is_empty());
    }
}
