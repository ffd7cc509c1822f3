//! Composite keys used by the re-indexed inventory views

use super::names::{Digest, ImageName, Tag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An image name paired with one of its digests
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageDigest {
    pub image_name: ImageName,
    pub digest: Digest,
}

impl ImageDigest {
    pub fn new(image_name: impl Into<ImageName>, digest: impl Into<Digest>) -> Self {
        Self {
            image_name: image_name.into(),
            digest: digest.into(),
        }
    }
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.image_name, self.digest)
    }
}

/// An image name paired with one of its tags
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageTag {
    pub image_name: ImageName,
    pub tag: Tag,
}

impl ImageTag {
    pub fn new(image_name: impl Into<ImageName>, tag: impl Into<Tag>) -> Self {
        Self {
            image_name: image_name.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.image_name, self.tag)
    }
}

/// Fully flattened key carrying all three attributes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageDigestTag {
    pub image_name: ImageName,
    pub digest: Digest,
    pub tag: Tag,
}

impl ImageDigestTag {
    pub fn new(
        image_name: impl Into<ImageName>,
        digest: impl Into<Digest>,
        tag: impl Into<Tag>,
    ) -> Self {
        Self {
            image_name: image_name.into(),
            digest: digest.into(),
            tag: tag.into(),
        }
    }
}
