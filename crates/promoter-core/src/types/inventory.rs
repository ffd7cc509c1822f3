//! Registry inventory shapes
//!
//! The same digest/tag relation is kept in several indexings, each suited to
//! a different comparison. `RegInvImage` is the natural view of a registry
//! (image, then digest); the others are derived from it in `crate::views`.

use super::keys::{ImageDigest, ImageDigestTag, ImageTag};
use super::names::{Digest, ImageName, RegistryName, Tag};
use super::request::{PromotionRequest, TagOp};
use crate::error::{Error, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::{Deref, DerefMut};

/// Ordered list of tags attached to one digest
pub type TagSlice = Vec<Tag>;

/// Set of tags
pub type TagSet = BTreeSet<Tag>;

macro_rules! map_view {
    ($(#[$meta:meta])* $name:ident, $key:ty, $value:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(BTreeMap<$key, $value>);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl Deref for $name {
            type Target = BTreeMap<$key, $value>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl FromIterator<($key, $value)> for $name {
            fn from_iter<I: IntoIterator<Item = ($key, $value)>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }

        impl IntoIterator for $name {
            type Item = ($key, $value);
            type IntoIter = std::collections::btree_map::IntoIter<$key, $value>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = (&'a $key, &'a $value);
            type IntoIter = std::collections::btree_map::Iter<'a, $key, $value>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

map_view!(
    /// Digests of one image and the tags pointing at each.
    ///
    /// A digest with an empty tag list is an untagged digest that is present
    /// in the registry, which is different from the digest being absent.
    DigestTags,
    Digest,
    TagSlice
);

map_view!(
    /// One registry's full state, keyed by image name then digest
    RegInvImage,
    ImageName,
    DigestTags
);

map_view!(
    /// Snapshot of several registries
    MasterInventory,
    RegistryName,
    RegInvImage
);

map_view!(
    /// Registry state keyed by (image, digest): what tags point at a digest
    RegInvImageDigest,
    ImageDigest,
    TagSlice
);

map_view!(
    /// Registry state keyed by (image, tag): what digest a tag resolves to
    RegInvImageTag,
    ImageTag,
    Digest
);

/// Fully flattened view of a registry: the set of (image, digest, tag) triples
pub type RegInvFlat = BTreeSet<ImageDigestTag>;

/// A registry together with its (image, digest) view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    /// Short registry name, as shown to users
    pub name: String,
    /// Full registry name used as inventory key
    pub name_long: RegistryName,
    pub image_digest: RegInvImageDigest,
}

impl DigestTags {
    /// Digest a tag currently resolves to, if any
    pub fn digest_of(&self, tag: &Tag) -> Option<&Digest> {
        self.iter()
            .find(|(_, tags)| tags.contains(tag))
            .map(|(digest, _)| digest)
    }

    /// All tags across every digest
    pub fn tags(&self) -> TagSet {
        self.values().flatten().cloned().collect()
    }
}

impl RegInvImage {
    /// Apply one tag mutation to this inventory.
    ///
    /// Add attaches the tag to the digest (creating the digest entry when it
    /// is absent), Move detaches the tag from `digest_old` and attaches it to
    /// `digest`, Delete detaches the tag from `digest`. Detaching never
    /// removes the digest itself; it stays as an untagged digest.
    pub fn apply(&mut self, request: &PromotionRequest) {
        let image = self.entry(request.image_name.clone()).or_default();
        match request.tag_op {
            TagOp::Add => attach(image, &request.digest, &request.tag),
            TagOp::Move => {
                if let Some(old) = &request.digest_old {
                    detach(image, old, &request.tag);
                }
                attach(image, &request.digest, &request.tag);
            }
            TagOp::Delete => detach(image, &request.digest, &request.tag),
        }
    }
}

fn attach(image: &mut DigestTags, digest: &Digest, tag: &Tag) {
    let tags = image.entry(digest.clone()).or_default();
    if !tags.contains(tag) {
        tags.push(tag.clone());
    }
}

fn detach(image: &mut DigestTags, digest: &Digest, tag: &Tag) {
    if let Some(tags) = image.get_mut(digest) {
        tags.retain(|t| t != tag);
    }
}

impl MasterInventory {
    /// Parse an inventory snapshot from YAML
    /// (registry -> image -> digest -> tags)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Load an inventory snapshot from a YAML file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        let inventory = Self::from_yaml_str(&content)?;
        tracing::debug!(
            "Loaded inventory for {} registries from {}",
            inventory.len(),
            path
        );
        Ok(inventory)
    }

    /// Inventory of one registry
    pub fn registry(&self, name: &RegistryName) -> Result<&RegInvImage> {
        self.get(name)
            .ok_or_else(|| Error::unknown_registry(name.as_str()))
    }
}
