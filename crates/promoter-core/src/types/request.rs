//! Promotion requests and their outcomes

use super::manifest::RegistryNames;
use super::names::{Digest, ImageName, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

/// Kind of tag mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOp {
    /// Point a tag that does not exist yet at a digest. Never overwrites.
    Add,
    /// Re-point an existing tag from `digest_old` to `digest`
    Move,
    /// Remove a tag that the manifest does not declare (a demotion)
    Delete,
}

impl fmt::Display for TagOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagOp::Add => write!(f, "add"),
            TagOp::Move => write!(f, "move"),
            TagOp::Delete => write!(f, "delete"),
        }
    }
}

/// One atomic tag mutation against the destination registry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PromotionRequest {
    pub tag_op: TagOp,
    pub registries: RegistryNames,
    pub image_name: ImageName,
    /// Digest the tag should point at (for Delete: the digest it points at now)
    pub digest: Digest,
    /// Digest being displaced; only set for moves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_old: Option<Digest>,
    pub tag: Tag,
}

impl PromotionRequest {
    /// Full reference of the destination tag touched by this request
    pub fn dest_ref(&self) -> String {
        self.registries.dest.tag_ref(&self.image_name, &self.tag)
    }

    /// Full reference of the source digest copied by this request
    pub fn src_ref(&self) -> String {
        self.registries.src.digest_ref(&self.image_name, &self.digest)
    }
}

impl fmt::Display for PromotionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag_op, &self.digest_old) {
            (TagOp::Move, Some(old)) => write!(
                f,
                "{} {} -> {} (was {})",
                self.tag_op,
                self.dest_ref(),
                self.digest,
                old
            ),
            _ => write!(f, "{} {} -> {}", self.tag_op, self.dest_ref(), self.digest),
        }
    }
}

/// A failure attached to a request, with context for diagnosis
#[derive(Debug)]
pub struct RequestError {
    pub context: String,
    pub error: anyhow::Error,
}

impl RequestError {
    pub fn new(context: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            context: context.into(),
            error,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.context, self.error)
    }
}

/// What happened to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    /// The mutation was performed (its errors, if any, are in `errors`)
    Executed,
    /// Dry-run: recorded in the captured requests, not performed
    Captured,
    /// The run was cancelled before the request was picked up
    NotAttempted,
}

/// Outcome of one request
#[derive(Debug)]
pub struct RequestResult {
    pub request: PromotionRequest,
    pub status: RequestStatus,
    pub errors: Vec<RequestError>,
}

impl RequestResult {
    pub fn executed(request: PromotionRequest) -> Self {
        Self {
            request,
            status: RequestStatus::Executed,
            errors: Vec::new(),
        }
    }

    pub fn failed(request: PromotionRequest, error: anyhow::Error) -> Self {
        let context = format!("running {}", request);
        Self {
            request,
            status: RequestStatus::Executed,
            errors: vec![RequestError::new(context, error)],
        }
    }

    pub fn captured(request: PromotionRequest) -> Self {
        Self {
            request,
            status: RequestStatus::Captured,
            errors: Vec::new(),
        }
    }

    pub fn not_attempted(request: PromotionRequest) -> Self {
        Self {
            request,
            status: RequestStatus::NotAttempted,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != RequestStatus::NotAttempted && self.errors.is_empty()
    }
}

/// Every request seen in dry-run mode with the number of times it was seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedRequests(BTreeMap<PromotionRequest, usize>);

impl CapturedRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of a request
    pub fn record(&mut self, request: &PromotionRequest) {
        *self.0.entry(request.clone()).or_insert(0) += 1;
    }

    /// Number of times a request was recorded
    pub fn count(&self, request: &PromotionRequest) -> usize {
        self.0.get(request).copied().unwrap_or(0)
    }

    /// Total occurrences across all requests
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

impl Deref for CapturedRequests {
    type Target = BTreeMap<PromotionRequest, usize>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<(PromotionRequest, usize)> for CapturedRequests {
    fn from_iter<I: IntoIterator<Item = (PromotionRequest, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
