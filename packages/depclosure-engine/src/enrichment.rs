/// Metadata enrichment pipeline
///
/// A fixed pool of workers drains a queue of source package names and fetches
/// their metadata concurrently with the closure walk:
/// - Fetch-once: a name is fetched at most once per pipeline, however often
///   it is enqueued
/// - Failures are cached as `None` and never retried
/// - [`EnrichmentPipeline::finish`] is the join barrier: it returns once every
///   accepted name has been fetched, then stops the workers
use crate::metadata::{MetadataSource, PackageMetadata};
use crate::walker::DiscoverySink;
use dashmap::{DashMap, DashSet};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Package name → metadata (`None`: unavailable)
pub type MetadataCache = BTreeMap<String, Option<PackageMetadata>>;

#[derive(Default)]
struct Shared {
    cache: DashMap<String, Option<PackageMetadata>>,
    /// Every name ever accepted; guards fetch-once
    claimed: DashSet<String>,
    /// Accepted but not yet fetched
    pending: AtomicUsize,
    drained: Notify,
    fetches: AtomicUsize,
}

impl Shared {
    fn complete_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Decrements `pending` even when a fetch panics
struct CompletionGuard<'a>(&'a Shared);

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.0.complete_one();
    }
}

/// Producer handle; cheap to clone and safe to use from blocking threads.
#[derive(Clone)]
pub struct EnrichmentQueue {
    sender: mpsc::UnboundedSender<String>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl EnrichmentQueue {
    /// Queue `name` unless it was queued before.
    ///
    /// Returns false once the pipeline has been shut down.
    pub fn enqueue(&self, name: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if !self.shared.claimed.insert(name.to_string()) {
            return true;
        }

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(name.to_string()).is_err() {
            self.shared.complete_one();
            return false;
        }
        true
    }

    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }
}

impl DiscoverySink for EnrichmentQueue {
    fn discovered(&self, name: &str) {
        if !self.enqueue(name) {
            debug!("Enrichment closed, dropping {}", name);
        }
    }
}

pub struct EnrichmentPipeline {
    queue: EnrichmentQueue,
    workers: Vec<JoinHandle<()>>,
}

impl EnrichmentPipeline {
    /// Spawn `workers` fetch tasks (at least one) on the current runtime.
    pub fn start(workers: usize, source: Arc<dyn MetadataSource>, branch: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let shared = Arc::new(Shared::default());
        let cancel = CancellationToken::new();
        let branch: Arc<str> = Arc::from(branch.into());

        let handles = (0..workers.max(1))
            .map(|_| {
                tokio::spawn(run_worker(
                    Arc::clone(&receiver),
                    Arc::clone(&shared),
                    Arc::clone(&source),
                    cancel.clone(),
                    Arc::clone(&branch),
                ))
            })
            .collect();

        Self {
            queue: EnrichmentQueue {
                sender,
                shared,
                cancel,
            },
            workers: handles,
        }
    }

    pub fn queue(&self) -> EnrichmentQueue {
        self.queue.clone()
    }

    pub fn enqueue(&self, name: &str) -> bool {
        self.queue.enqueue(name)
    }

    /// Number of completed fetches so far
    pub fn fetch_count(&self) -> usize {
        self.queue.shared.fetches.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait until every accepted name has been fetched.
    pub async fn wait_drained(&self) {
        let shared = &self.queue.shared;
        loop {
            let notified = shared.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Join barrier: drain the queue, stop the workers and hand over the cache.
    pub async fn finish(mut self) -> MetadataCache {
        self.wait_drained().await;
        self.queue.cancel.cancel();

        let workers = std::mem::take(&mut self.workers);
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!("Metadata worker failed: {}", e);
            }
        }

        self.queue
            .shared
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Drop for EnrichmentPipeline {
    fn drop(&mut self) {
        self.queue.cancel.cancel();
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn run_worker(
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    shared: Arc<Shared>,
    source: Arc<dyn MetadataSource>,
    cancel: CancellationToken,
    branch: Arc<str>,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            name = async { receiver.lock().await.recv().await } => name,
        };
        let Some(name) = next else {
            break;
        };

        let _done = CompletionGuard(&shared);
        let metadata = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Fetch of {} cancelled", name);
                break;
            }
            metadata = source.fetch(&name) => metadata,
        };
        shared.cache.insert(name.clone(), metadata);
        shared.fetches.fetch_add(1, Ordering::SeqCst);

        let todo = shared.pending.load(Ordering::SeqCst).saturating_sub(1);
        info!("Got info for {} on {}, todo: {}", name, branch, todo);
    }
}
