//! Conversions between the inventory views
//!
//! All views describe the same digest/tag relation, so converting between
//! them is pure and lossless, with two exceptions: the tag-keyed and flat
//! views cannot express untagged digests. Flattening into the tag-keyed
//! view fails with `Error::DuplicateTag` rather than overwriting when one
//! tag is claimed by two digests of the same image.

use crate::error::{Error, Result};
use crate::types::{
    Digest, DigestTags, ImageDigest, ImageDigestTag, ImageName, ImageTag, Manifest, RegInvFlat,
    RegInvImage, RegInvImageDigest, RegInvImageTag, Registry, RegistryName, Tag,
};

fn insert_tag(
    riit: &mut RegInvImageTag,
    image_name: &ImageName,
    tag: &Tag,
    digest: &Digest,
) -> Result<()> {
    let key = ImageTag::new(image_name.clone(), tag.clone());
    match riit.get(&key) {
        Some(existing) if existing != digest => Err(Error::duplicate_tag(
            image_name.as_str(),
            tag.as_str(),
            existing.as_str(),
            digest.as_str(),
        )),
        Some(_) => Ok(()),
        None => {
            riit.insert(key, digest.clone());
            Ok(())
        }
    }
}

impl RegInvImage {
    /// Re-index by (image, digest), keeping untagged digests as keys
    pub fn to_image_digest(&self) -> RegInvImageDigest {
        self.iter()
            .flat_map(|(image_name, dmap)| {
                dmap.iter().map(move |(digest, tags)| {
                    (ImageDigest::new(image_name.clone(), digest.clone()), tags.clone())
                })
            })
            .collect()
    }

    /// Re-index by (image, tag)
    pub fn to_image_tag(&self) -> Result<RegInvImageTag> {
        let mut riit = RegInvImageTag::new();
        for (image_name, dmap) in self.iter() {
            for (digest, tags) in dmap.iter() {
                for tag in tags {
                    insert_tag(&mut riit, image_name, tag, digest)?;
                }
            }
        }
        Ok(riit)
    }

    /// Flatten into (image, digest, tag) triples
    pub fn to_flat(&self) -> RegInvFlat {
        self.to_image_digest().to_flat()
    }
}

impl RegInvImageDigest {
    /// Re-index by (image, tag)
    pub fn to_image_tag(&self) -> Result<RegInvImageTag> {
        let mut riit = RegInvImageTag::new();
        for (id, tags) in self.iter() {
            for tag in tags {
                insert_tag(&mut riit, &id.image_name, tag, &id.digest)?;
            }
        }
        Ok(riit)
    }

    /// Back to the natural (image, then digest) view
    pub fn to_reg_inv_image(&self) -> RegInvImage {
        let mut rii = RegInvImage::new();
        for (id, tags) in self.iter() {
            rii.entry(id.image_name.clone())
                .or_default()
                .insert(id.digest.clone(), tags.clone());
        }
        rii
    }

    /// Flatten into (image, digest, tag) triples
    pub fn to_flat(&self) -> RegInvFlat {
        self.iter()
            .flat_map(|(id, tags)| {
                tags.iter().map(move |tag| {
                    ImageDigestTag::new(id.image_name.clone(), id.digest.clone(), tag.clone())
                })
            })
            .collect()
    }
}

impl RegInvImageTag {
    /// Back to the natural view. Untagged digests are not representable here.
    pub fn to_reg_inv_image(&self) -> RegInvImage {
        let mut rii = RegInvImage::new();
        for (it, digest) in self.iter() {
            rii.entry(it.image_name.clone())
                .or_default()
                .entry(digest.clone())
                .or_default()
                .push(it.tag.clone());
        }
        rii
    }

    /// Tags of one image, with the digest each resolves to
    pub fn image_tags<'a>(
        &'a self,
        image_name: &'a ImageName,
    ) -> impl Iterator<Item = (&'a Tag, &'a Digest)> + 'a {
        self.iter()
            .filter(move |(it, _)| &it.image_name == image_name)
            .map(|(it, digest)| (&it.tag, digest))
    }
}

impl Manifest {
    /// Desired state keyed by (image, digest)
    pub fn to_image_digest(&self) -> RegInvImageDigest {
        self.to_reg_inv_image().to_image_digest()
    }

    /// Desired state keyed by (image, tag)
    pub fn to_image_tag(&self) -> Result<RegInvImageTag> {
        self.to_reg_inv_image().to_image_tag()
    }

    /// Destination registry of this manifest with its desired digest view
    pub fn dest_registry(&self) -> Registry {
        registry_view(&self.registries.dest, &self.to_reg_inv_image())
    }
}

/// Build the (image, digest) registry view for a named registry
pub fn registry_view(name: &RegistryName, rii: &RegInvImage) -> Registry {
    let short = name
        .as_str()
        .rsplit('/')
        .next()
        .unwrap_or(name.as_str())
        .to_string();
    Registry {
        name: short,
        name_long: name.clone(),
        image_digest: rii.to_image_digest(),
    }
}

impl From<&RegInvImage> for RegInvImageDigest {
    fn from(rii: &RegInvImage) -> Self {
        rii.to_image_digest()
    }
}

impl From<&RegInvImageDigest> for RegInvImage {
    fn from(riid: &RegInvImageDigest) -> Self {
        riid.to_reg_inv_image()
    }
}

impl DigestTags {
    /// Build from (digest, tags) pairs
    pub fn from_pairs<D, T, I>(pairs: I) -> Self
    where
        D: Into<Digest>,
        T: Into<Tag>,
        I: IntoIterator<Item = (D, Vec<T>)>,
    {
        pairs
            .into_iter()
            .map(|(d, tags)| (d.into(), tags.into_iter().map(Into::into).collect()))
            .collect()
    }
}
