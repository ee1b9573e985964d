//! Fixed-size executor pool over a shared pull queue

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::error::PipelineError;
use super::shutdown::ShutdownSignal;
use crate::capability::SessionFactory;
use crate::extraction::{ExtractionPlan, ItemOutcome, ItemStatus, PoolReport, StageFailure, process_token};
use crate::snapshot::{Snapshot, TokenDescriptor};
use crate::store::TokenStore;

/// Shared, read-only state every item task needs.
struct ItemContext {
    factory: Arc<dyn SessionFactory>,
    store: TokenStore,
    plan: Arc<ExtractionPlan>,
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<TokenDescriptor>>>;
type Outcomes = Arc<parking_lot::Mutex<Vec<ItemOutcome>>>;

/// N concurrent executors pulling tokens from one queue.
///
/// Storage and browser handles are injected once and shared by every
/// executor. Each executor owns at most one browser session at a time.
pub struct WorkerPool {
    ctx: Arc<ItemContext>,
    workers: usize,
    shutdown: ShutdownSignal,
}

impl WorkerPool {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        store: TokenStore,
        plan: Arc<ExtractionPlan>,
        workers: usize,
    ) -> Self {
        Self {
            ctx: Arc::new(ItemContext {
                factory,
                store,
                plan,
            }),
            workers: workers.max(1),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Share an externally owned stop signal (Ctrl-C handling, the feeder).
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every token of a snapshot to exhaustion.
    pub async fn run_snapshot(&self, snapshot: &Snapshot) -> Result<PoolReport, PipelineError> {
        let (sender, receiver) = mpsc::channel(snapshot.tokens.len().max(1));
        for descriptor in &snapshot.tokens {
            if sender.send(descriptor.clone()).await.is_err() {
                break;
            }
        }
        drop(sender);

        info!(
            version = snapshot.version,
            tokens = snapshot.tokens.len(),
            workers = self.workers,
            "Processing snapshot"
        );
        self.run_queue(receiver)
            .instrument(info_span!("snapshot", version = snapshot.version))
            .await
    }

    /// Drain `receiver` until every sender is dropped or a stop is requested.
    ///
    /// Returns the per-item report. A lost storage connection stops the pool
    /// and is returned as [`PipelineError::StorageConnectionLost`] carrying
    /// the outcomes recorded so far.
    pub async fn run_queue(
        &self,
        receiver: mpsc::Receiver<TokenDescriptor>,
    ) -> Result<PoolReport, PipelineError> {
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));
        let outcomes: Outcomes = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut executors = FuturesUnordered::new();
        for worker in 0..self.workers {
            let queue = Arc::clone(&queue);
            let ctx = Arc::clone(&self.ctx);
            let shutdown = self.shutdown.clone();
            let outcomes = Arc::clone(&outcomes);

            executors.push(tokio::spawn(
                executor_loop(queue, ctx, shutdown, outcomes)
                    .instrument(info_span!("executor", worker)),
            ));
        }

        while let Some(joined) = executors.next().await {
            if let Err(e) = joined {
                error!("Executor task panicked: {e}");
            }
        }

        let report = PoolReport {
            outcomes: std::mem::take(&mut *outcomes.lock()),
        };
        info!(
            completed = report.completed(),
            failed = report.failed(),
            "Worker pool drained"
        );

        match self.shutdown.fatal_reason() {
            Some(reason) => Err(PipelineError::StorageConnectionLost { reason, report }),
            None => Ok(report),
        }
    }
}

async fn executor_loop(
    queue: SharedQueue,
    ctx: Arc<ItemContext>,
    shutdown: ShutdownSignal,
    outcomes: Outcomes,
) {
    loop {
        if shutdown.is_requested() {
            debug!("Shutdown requested; executor stopping");
            break;
        }

        let next = {
            let mut receiver = queue.lock().await;
            tokio::select! {
                item = receiver.recv() => item,
                () = shutdown.requested() => None,
            }
        };
        let Some(descriptor) = next else {
            break;
        };

        let token = descriptor.address.clone();
        let status = run_isolated(&ctx, descriptor)
            .instrument(info_span!("item", token = %token))
            .await;

        match &status {
            ItemStatus::Completed { traders, skipped } => {
                info!(token = %token, traders, skipped = skipped.len(), "Token completed");
            }
            ItemStatus::Failed { reason } => {
                warn!(token = %token, reason = %reason, "Token failed");
                if reason.is_fatal() {
                    error!("Storage connection lost; stopping worker pool");
                    shutdown.trip_fatal(reason.to_string());
                }
            }
        }

        outcomes.lock().push(ItemOutcome { token, status });
    }
}

/// Run one item in its own task so a panic only fails that item.
async fn run_isolated(ctx: &Arc<ItemContext>, descriptor: TokenDescriptor) -> ItemStatus {
    let ctx = Arc::clone(ctx);
    let task = tokio::spawn(
        async move {
            process_token(ctx.factory.as_ref(), &ctx.store, &ctx.plan, &descriptor).await
        }
        .in_current_span(),
    );

    match task.await {
        Ok(status) => status,
        Err(e) => {
            error!("Task panicked: {e}");
            ItemStatus::Failed {
                reason: StageFailure::Panicked,
            }
        }
    }
}
