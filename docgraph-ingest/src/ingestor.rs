use crate::error::{IngestError, Result, StoreError};
use crate::result::{IngestReport, WorkerFailure, WorkerOutcome};
use crate::session::{Compile, CompileMode, GraphStore, Session};
use futures::future::join_all;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Called after every handled item with `(worker, items processed so far)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Sizes of `parts` contiguous partitions of a list of `len` items.
///
/// Every part gets `len / parts` items and the first `len % parts` parts get
/// one more, so sizes never differ by more than one. Zero parts yields no
/// partitions at all.
pub fn partition_sizes(len: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let remainder = len % parts;
    (0..parts).map(|i| base + usize::from(i < remainder)).collect()
}

/// Split `items` into `parts` contiguous, order-preserving partitions.
/// Concatenating the result gives back the original list.
pub fn split_into_parts<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let sizes = partition_sizes(items.len(), parts);
    let mut rest = items.into_iter();
    sizes
        .into_iter()
        .map(|size| rest.by_ref().take(size).collect())
        .collect()
}

/// Runs compiled statements against a [`GraphStore`] with one blocking
/// worker per partition.
pub struct Ingestor<S: GraphStore> {
    store: Arc<S>,
    progress_callback: Option<ProgressCallback>,
}

impl<S: GraphStore> Clone for Ingestor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            progress_callback: self.progress_callback.clone(),
        }
    }
}

impl<S: GraphStore> Ingestor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Execute one compiled statement per item and wait for every worker.
    ///
    /// Items are split into `concurrency` partitions; each non-empty
    /// partition gets its own worker and session. A statement rejected as a
    /// syntax error is recompiled with [`CompileMode::IgnoreContent`] and
    /// executed once more. Any other error stops that worker and leaves the
    /// rest of its partition untouched; the returned report says where.
    pub async fn ingest<T, C>(
        &self,
        items: Vec<T>,
        compiler: Arc<C>,
        concurrency: usize,
    ) -> Result<IngestReport>
    where
        T: Send + 'static,
        C: Compile<T> + ?Sized + 'static,
    {
        if concurrency == 0 {
            return Err(IngestError::InvalidConcurrency(concurrency));
        }

        let total_items = items.len();
        info!("Ingesting {} items with {} workers", total_items, concurrency);

        let mut worker_handles = Vec::new();
        for (worker, part) in split_into_parts(items, concurrency)
            .into_iter()
            .enumerate()
        {
            if part.is_empty() {
                continue;
            }
            let partition_len = part.len();
            let store = self.store.clone();
            let compiler = compiler.clone();
            let progress_cb = self.progress_callback.clone();

            let handle = tokio::task::spawn_blocking(move || {
                run_partition(
                    worker,
                    store.as_ref(),
                    &part,
                    compiler.as_ref(),
                    progress_cb.as_ref(),
                )
            });
            worker_handles.push((worker, partition_len, handle));
        }

        // Wait for all workers to complete
        let joined = join_all(
            worker_handles
                .into_iter()
                .map(|(worker, partition_len, handle)| async move {
                    (worker, partition_len, handle.await)
                }),
        )
        .await;

        let outcomes: Vec<WorkerOutcome> = joined
            .into_iter()
            .map(|(worker, partition_len, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Worker {} did not finish: {}", worker, e);
                    WorkerOutcome::with_failure(
                        worker,
                        partition_len,
                        WorkerFailure::Panicked(e.to_string()),
                    )
                }
            })
            .collect();

        let report = IngestReport {
            total_items,
            outcomes,
        };
        info!(
            "Ingest finished: {}/{} items, {} fallbacks, {} failed workers",
            report.processed(),
            total_items,
            report.fallbacks(),
            report.failures().count()
        );
        Ok(report)
    }
}

enum Executed {
    Full,
    Fallback,
    Skipped,
}

fn run_partition<S, T, C>(
    worker: usize,
    store: &S,
    items: &[T],
    compiler: &C,
    progress: Option<&ProgressCallback>,
) -> WorkerOutcome
where
    S: GraphStore,
    C: Compile<T> + ?Sized,
{
    debug!("Worker {} started with {} items", worker, items.len());
    let mut outcome = WorkerOutcome::new(worker, items.len());

    let mut session = match store.open_session() {
        Ok(session) => session,
        Err(e) => {
            warn!("Worker {} could not open a session: {}", worker, e);
            outcome.failure = Some(WorkerFailure::Session(e));
            return outcome;
        }
    };

    // A panic keeps the counts of the items already handled
    let run = catch_unwind(AssertUnwindSafe(|| {
        for (index, item) in items.iter().enumerate() {
            match execute_item(&mut session, item, compiler) {
                Ok(Executed::Full) => {}
                Ok(Executed::Fallback) => outcome.fallbacks += 1,
                Ok(Executed::Skipped) => outcome.skipped += 1,
                Err(error) => {
                    warn!("Worker {} stopped at item {}: {}", worker, index, error);
                    outcome.failure = Some(WorkerFailure::Item { index, error });
                    break;
                }
            }
            outcome.processed += 1;

            if let Some(callback) = progress {
                callback(worker, outcome.processed);
            }
        }
    }));
    if let Err(payload) = run {
        let message = panic_message(payload.as_ref());
        warn!(
            "Worker {} panicked after {} items: {}",
            worker, outcome.processed, message
        );
        outcome.failure = Some(WorkerFailure::Panicked(message));
    }

    debug!(
        "Worker {} finished ({}/{} items)",
        worker, outcome.processed, outcome.partition_len
    );
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn execute_item<X, T, C>(
    session: &mut X,
    item: &T,
    compiler: &C,
) -> std::result::Result<Executed, StoreError>
where
    X: Session,
    C: Compile<T> + ?Sized,
{
    let statement = compiler.compile(item, CompileMode::Full);
    if statement.trim().is_empty() {
        return Ok(Executed::Skipped);
    }

    match session.execute(&statement) {
        Ok(()) => Ok(Executed::Full),
        Err(e) if e.is_syntax() => {
            warn!("Statement rejected, retrying without content: {}", e);
            let fallback = compiler.compile(item, CompileMode::IgnoreContent);
            if fallback.trim().is_empty() {
                return Ok(Executed::Skipped);
            }
            // No further retry: whatever this returns is final.
            session.execute(&fallback)?;
            Ok(Executed::Fallback)
        }
        Err(e) => Err(e),
    }
}
