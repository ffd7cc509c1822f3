//! Bounded worker pool executing promotion requests
//!
//! Requests are routed to workers by image: every request of an image goes
//! to the same worker, in the order it was generated, so the Add, Move,
//! Delete sequence of an image is never reordered. Different images run in
//! parallel across up to `threads` workers.
//!
//! A failing request only affects its own result, even when the mutator
//! panics. In dry-run mode nothing is performed and each request is counted
//! in the shared captured-requests map.

use crate::context::SyncContext;
use crate::error::Result;
use crate::mutator::Mutator;
use crate::report::Report;
use anyhow::anyhow;
use futures::future::join_all;
use futures::FutureExt;
use promoter_core::{
    CapturedRequests, Error as CoreError, ImageName, PromotionRequest, RequestResult,
};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cooperative cancellation of a running execution.
///
/// Workers finish the request they are running, then report every request
/// left in their queue as not attempted.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    /// Ask workers to stop pulling new requests
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Runs requests against a mutator with bounded parallelism
pub struct RequestExecutor {
    threads: usize,
    dry_run: bool,
    mutator: Arc<dyn Mutator>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl RequestExecutor {
    /// Create an executor using the width and mode of a run
    ///
    /// # Errors
    /// Returns `InvalidThreads` if the context asks for fewer than one worker
    pub fn new(ctx: &SyncContext, mutator: Arc<dyn Mutator>) -> Result<Self> {
        if ctx.threads < 1 {
            return Err(CoreError::InvalidThreads {
                threads: ctx.threads,
            }
            .into());
        }

        let (cancel_tx, _) = watch::channel(false);
        Ok(Self {
            threads: ctx.threads,
            dry_run: ctx.dry_run,
            mutator,
            cancel_tx: Arc::new(cancel_tx),
        })
    }

    /// Handle that can cancel this executor's runs
    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            sender: Arc::clone(&self.cancel_tx),
        }
    }

    /// Execute all requests and wait for every worker to finish.
    ///
    /// The report contains exactly one result per request.
    pub async fn execute(&self, requests: Vec<PromotionRequest>) -> Result<Report> {
        let total = requests.len();
        let lanes = partition_by_image(requests, self.threads);
        debug!(
            "Executing {} requests on {} workers{}",
            total,
            lanes.len(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let captured = Arc::new(Mutex::new(CapturedRequests::new()));

        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(lanes.len());
        for (id, lane) in lanes.into_iter().enumerate() {
            let (work_tx, work_rx) = mpsc::unbounded_channel();
            for request in lane {
                // the receiver is alive until the worker below drops it
                let _ = work_tx.send(request);
            }
            drop(work_tx);

            let worker = Worker {
                id,
                dry_run: self.dry_run,
                mutator: Arc::clone(&self.mutator),
                captured: Arc::clone(&captured),
                cancel: self.cancel_tx.subscribe(),
            };
            workers.push(tokio::spawn(worker.run(work_rx, results_tx.clone())));
        }
        drop(results_tx);

        // Barrier: every worker has drained its queue before results are read
        for joined in join_all(workers).await {
            joined?;
        }

        let mut results = Vec::with_capacity(total);
        while let Some(result) = results_rx.recv().await {
            results.push(result);
        }

        let captured = if self.dry_run {
            let captured = match captured.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            Some(captured)
        } else {
            None
        };

        Ok(Report::new(results, captured))
    }
}

struct Worker {
    id: usize,
    dry_run: bool,
    mutator: Arc<dyn Mutator>,
    captured: Arc<Mutex<CapturedRequests>>,
    cancel: watch::Receiver<bool>,
}

impl Worker {
    async fn run(
        self,
        mut work: mpsc::UnboundedReceiver<PromotionRequest>,
        results: mpsc::UnboundedSender<RequestResult>,
    ) {
        let mut handled = 0usize;
        while let Some(request) = work.recv().await {
            let cancelled = *self.cancel.borrow();
            let result = if cancelled {
                RequestResult::not_attempted(request)
            } else {
                self.handle(request).await
            };
            handled += 1;
            if results.send(result).is_err() {
                break;
            }
        }
        debug!("Worker {} finished after {} requests", self.id, handled);
    }

    async fn handle(&self, request: PromotionRequest) -> RequestResult {
        if self.dry_run {
            self.capture(&request);
            debug!("[dry run] {}", request);
            return RequestResult::captured(request);
        }

        // A panicking mutator fails its request, not the worker
        let outcome = AssertUnwindSafe(self.mutator.execute(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(anyhow!("mutator panicked: {}", panic_message(panic.as_ref())))
            });

        match outcome {
            Ok(()) => RequestResult::executed(request),
            Err(e) => {
                warn!("Request failed: {}: {:#}", request, e);
                RequestResult::failed(request, e)
            }
        }
    }

    fn capture(&self, request: &PromotionRequest) {
        match self.captured.lock() {
            Ok(mut captured) => captured.record(request),
            Err(poisoned) => poisoned.into_inner().record(request),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

/// Split requests into at most `threads` lanes, keeping each image in one
/// lane and preserving request order. Images are assigned round-robin in
/// order of first appearance.
fn partition_by_image(
    requests: Vec<PromotionRequest>,
    threads: usize,
) -> Vec<Vec<PromotionRequest>> {
    let mut lanes: Vec<Vec<PromotionRequest>> = Vec::new();
    let mut assigned: HashMap<ImageName, usize> = HashMap::new();

    for request in requests {
        let next = assigned.len() % threads;
        let lane = *assigned.entry(request.image_name.clone()).or_insert(next);
        if lane == lanes.len() {
            lanes.push(Vec::new());
        }
        lanes[lane].push(request);
    }

    lanes
}

#[cfg(test)]
mod tests {
    use super::*;
    use promoter_core::{Digest, RegistryNames, Tag, TagOp};

    fn request(image: &str, tag: &str) -> PromotionRequest {
        PromotionRequest {
            tag_op: TagOp::Add,
            registries: RegistryNames::new("s", "d"),
            image_name: ImageName::from(image),
            digest: Digest::from("sha256:x"),
            digest_old: None,
            tag: Tag::from(tag),
        }
    }

    #[test]
    fn test_partition_keeps_images_together() {
        let requests = vec![
            request("a", "1"),
            request("b", "1"),
            request("c", "1"),
            request("a", "2"),
            request("b", "2"),
        ];
        let lanes = partition_by_image(requests, 2);
        assert_eq!(lanes.len(), 2);

        let tags = |lane: &Vec<PromotionRequest>| -> Vec<String> {
            lane.iter()
                .map(|r| format!("{}:{}", r.image_name, r.tag))
                .collect()
        };
        assert_eq!(tags(&lanes[0]), vec!["a:1", "c:1", "a:2"]);
        assert_eq!(tags(&lanes[1]), vec!["b:1", "b:2"]);
    }

    #[test]
    fn test_partition_single_thread() {
        let lanes = partition_by_image(vec![request("a", "1"), request("b", "1")], 1);
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].len(), 2);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_by_image(Vec::new(), 4).is_empty());
    }
}
