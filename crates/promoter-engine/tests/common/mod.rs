//! Builders and mock mutators shared by the engine integration tests

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use promoter_core::{
    DigestTags, Image, ImageName, Manifest, PromotionRequest, RegInvImage, RegistryNames,
    SyncConfig, Tag,
};
use promoter_engine::{CancellationHandle, Mutator, SyncContext};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

pub const SRC: &str = "gcr.io/staging";
pub const DEST: &str = "gcr.io/prod";

/// (image, [(digest, [tags])])
pub type ImageSpec = (&'static str, Vec<(&'static str, Vec<&'static str>)>);

pub fn manifest(images: Vec<ImageSpec>) -> Manifest {
    Manifest {
        registries: RegistryNames::new(SRC, DEST),
        service_account: None,
        images: images
            .into_iter()
            .map(|(name, digests)| Image {
                image_name: ImageName::from(name),
                dmap: DigestTags::from_pairs(digests),
            })
            .collect(),
    }
}

pub fn inventory(images: Vec<ImageSpec>) -> RegInvImage {
    images
        .into_iter()
        .map(|(name, digests)| (ImageName::from(name), DigestTags::from_pairs(digests)))
        .collect()
}

pub fn context(threads: usize, dry_run: bool, delete_extra_tags: bool) -> SyncContext {
    let config = SyncConfig {
        threads,
        dry_run,
        delete_extra_tags,
        verbosity: 0,
    };
    SyncContext::new(&config).expect("valid test config")
}

/// Records every executed request in call order, failing selected tags
#[derive(Default)]
pub struct RecordingMutator {
    calls: Mutex<Vec<PromotionRequest>>,
    failing_tags: HashSet<Tag>,
}

impl RecordingMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(tags: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing_tags: tags.iter().map(|t| Tag::from(*t)).collect(),
        }
    }

    pub fn calls(&self) -> Vec<PromotionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mutator for RecordingMutator {
    async fn execute(&self, request: &PromotionRequest) -> Result<()> {
        self.calls.lock().unwrap().push(request.clone());
        if self.failing_tags.contains(&request.tag) {
            bail!("simulated registry failure for {}", request.tag);
        }
        Ok(())
    }
}

/// Cancels the run from inside its first mutation
#[derive(Default)]
pub struct CancellingMutator {
    handle: OnceLock<CancellationHandle>,
    calls: Mutex<usize>,
}

impl CancellingMutator {
    pub fn arm(&self, handle: CancellationHandle) {
        let _ = self.handle.set(handle);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Mutator for CancellingMutator {
    async fn execute(&self, _request: &PromotionRequest) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        if let Some(handle) = self.handle.get() {
            handle.cancel();
        }
        Ok(())
    }
}

/// Panics while executing requests for one tag
pub struct PanickingMutator {
    tag: Tag,
}

impl PanickingMutator {
    pub fn on_tag(tag: &str) -> Self {
        Self { tag: Tag::from(tag) }
    }
}

#[async_trait]
impl Mutator for PanickingMutator {
    async fn execute(&self, request: &PromotionRequest) -> Result<()> {
        if request.tag == self.tag {
            panic!("simulated panic on {}", request.tag);
        }
        Ok(())
    }
}

pub fn shared<M: Mutator + 'static>(mutator: M) -> (Arc<M>, Arc<dyn Mutator>) {
    let concrete = Arc::new(mutator);
    let dynamic: Arc<dyn Mutator> = concrete.clone();
    (concrete, dynamic)
}
