//! # promoter-core
//!
//! Core library for the image promoter providing:
//! - Semantic names and composite keys for registry state
//! - Inventory views (image, image+digest, image+tag, flat) and lossless
//!   conversion between them
//! - The manifest model describing desired registry state
//! - Promotion requests, per-request results and captured requests
//! - Run configuration with file and environment overrides

pub mod config;
pub mod error;
pub mod types;
pub mod views;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use types::{
    CapturedRequests, Digest, DigestTags, Image, ImageDigest, ImageDigestTag, ImageName,
    ImageTag, Manifest, MasterInventory, PromotionRequest, RegInvFlat, RegInvImage,
    RegInvImageDigest, RegInvImageTag, Registry, RegistryName, RegistryNames, RequestError,
    RequestResult, RequestStatus, Tag, TagOp, TagSet, TagSlice,
};
