//! Reconciliation: diff desired state against actual state
//!
//! Every tag of an image ends up in at most one category:
//! - Add: the tag is declared but does not exist in the destination
//! - Move: the tag exists but resolves to a different digest
//! - Delete: the tag exists but is not declared (only with `delete_extra_tags`)
//!
//! Within one image requests are ordered Add, then Move, then Delete. Images
//! are independent of one another.

use crate::context::SyncContext;
use crate::error::Result;
use promoter_core::{
    Digest, Error as CoreError, ImageDigest, ImageName, ImageTag, Manifest, PromotionRequest,
    RegInvImage, RegistryNames, Tag, TagOp, TagSet,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Produces the promotion requests for a run
pub trait RequestGenerator: Send + Sync {
    /// Compute every request needed to converge the destination registry.
    ///
    /// Either all requests are returned or none are: malformed input fails
    /// before anything is generated.
    fn generate_requests(&self, ctx: &SyncContext) -> Result<Vec<PromotionRequest>>;
}

/// Generates requests from a manifest against the destination inventory
#[derive(Debug, Clone)]
pub struct ManifestReconciler {
    manifest: Manifest,
}

impl ManifestReconciler {
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

impl RequestGenerator for ManifestReconciler {
    fn generate_requests(&self, ctx: &SyncContext) -> Result<Vec<PromotionRequest>> {
        let actual = ctx.registry_inventory(&self.manifest.registries.dest);
        reconcile(&self.manifest, &actual, ctx.delete_extra_tags)
    }
}

/// Requests of one image, kept apart by category for ordering
#[derive(Debug, Default)]
struct ImagePlan {
    adds: Vec<PromotionRequest>,
    moves: Vec<PromotionRequest>,
    deletes: Vec<PromotionRequest>,
}

/// Collects requests and enforces one operation per (image, tag)
#[derive(Debug, Default)]
struct Plan {
    images: BTreeMap<ImageName, ImagePlan>,
    claimed: BTreeMap<ImageTag, TagOp>,
}

impl Plan {
    fn push(&mut self, request: PromotionRequest) -> Result<()> {
        let key = ImageTag::new(request.image_name.clone(), request.tag.clone());
        if let Some(existing) = self.claimed.get(&key) {
            return Err(CoreError::conflicting_operations(
                request.image_name.as_str(),
                request.tag.as_str(),
                existing.to_string(),
                request.tag_op.to_string(),
            )
            .into());
        }
        self.claimed.insert(key, request.tag_op);

        trace!("Planned {}", request);
        let image = self.images.entry(request.image_name.clone()).or_default();
        match request.tag_op {
            TagOp::Add => image.adds.push(request),
            TagOp::Move => image.moves.push(request),
            TagOp::Delete => image.deletes.push(request),
        }
        Ok(())
    }

    fn into_requests(self) -> Vec<PromotionRequest> {
        self.images
            .into_values()
            .flat_map(|plan| {
                plan.adds
                    .into_iter()
                    .chain(plan.moves)
                    .chain(plan.deletes)
            })
            .collect()
    }
}

/// Compute the ordered requests that make `actual` match `manifest`.
///
/// Images absent from the manifest are never touched. Deletes are only
/// generated when `delete_extra_tags` is set.
pub fn reconcile(
    manifest: &Manifest,
    actual: &RegInvImage,
    delete_extra_tags: bool,
) -> Result<Vec<PromotionRequest>> {
    // Both views are checked for duplicate tag claims before anything is planned
    let desired_tags = manifest.to_image_tag()?;
    let actual_tags = actual.to_image_tag()?;
    let desired_digests = manifest.to_image_digest();
    let actual_digests = actual.to_image_digest();

    let registries = &manifest.registries;
    let mut plan = Plan::default();

    // Adds: tags declared for a digest that the destination does not have at all
    for (id, tags) in desired_digests.iter() {
        let present: TagSet = actual_digests
            .get(id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default();
        for tag in tags {
            if present.contains(tag) {
                continue;
            }
            let key = ImageTag::new(id.image_name.clone(), tag.clone());
            if actual_tags.contains_key(&key) {
                // exists under another digest: handled as a move
                continue;
            }
            plan.push(request(registries, TagOp::Add, id, None, tag))?;
        }
    }

    // Moves: tag-scoped conflicts between desired and actual
    for (it, digest) in desired_tags.iter() {
        if let Some(old) = actual_tags.get(it) {
            if old != digest {
                let id = ImageDigest::new(it.image_name.clone(), digest.clone());
                plan.push(request(registries, TagOp::Move, &id, Some(old), &it.tag))?;
            }
        }
    }

    // Deletes: undeclared tags of declared images
    if delete_extra_tags {
        for (it, digest) in actual_tags.iter() {
            if manifest.declares(&it.image_name) && !desired_tags.contains_key(it) {
                let id = ImageDigest::new(it.image_name.clone(), digest.clone());
                plan.push(request(registries, TagOp::Delete, &id, None, &it.tag))?;
            }
        }
    }

    let requests = plan.into_requests();
    debug!(
        "Reconciled {} images into {} requests",
        manifest.images.len(),
        requests.len()
    );
    Ok(requests)
}

fn request(
    registries: &RegistryNames,
    tag_op: TagOp,
    id: &ImageDigest,
    digest_old: Option<&Digest>,
    tag: &Tag,
) -> PromotionRequest {
    PromotionRequest {
        tag_op,
        registries: registries.clone(),
        image_name: id.image_name.clone(),
        digest: id.digest.clone(),
        digest_old: digest_old.cloned(),
        tag: tag.clone(),
    }
}
