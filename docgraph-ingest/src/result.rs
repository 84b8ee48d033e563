use crate::error::StoreError;
use std::fmt;

/// Why a worker stopped before finishing its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    /// The session could not be opened; nothing in the partition ran.
    Session(StoreError),
    /// Executing the item at `index` (relative to the partition) failed.
    Item { index: usize, error: StoreError },
    /// The worker task panicked.
    Panicked(String),
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerFailure::Session(e) => write!(f, "could not open session: {}", e),
            WorkerFailure::Item { index, error } => write!(f, "item {} failed: {}", index, error),
            WorkerFailure::Panicked(msg) => write!(f, "worker panicked: {}", msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub partition_len: usize,
    /// Items fully handled, in partition order. On failure this is also the
    /// index of the item that failed.
    pub processed: usize,
    /// Items that only went through after the content-suppressed retry.
    pub fallbacks: usize,
    /// Items whose compiled statement was blank.
    pub skipped: usize,
    pub failure: Option<WorkerFailure>,
}

impl WorkerOutcome {
    pub fn new(worker: usize, partition_len: usize) -> Self {
        Self {
            worker,
            partition_len,
            processed: 0,
            fallbacks: 0,
            skipped: 0,
            failure: None,
        }
    }

    pub fn with_failure(worker: usize, partition_len: usize, failure: WorkerFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(worker, partition_len)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.processed == self.partition_len
    }

    pub fn remaining(&self) -> usize {
        self.partition_len - self.processed
    }
}

/// Aggregated result of one `ingest` call, one outcome per spawned worker in
/// partition order.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub total_items: usize,
    pub outcomes: Vec<WorkerOutcome>,
}

impl IngestReport {
    pub fn processed(&self) -> usize {
        self.outcomes.iter().map(|o| o.processed).sum()
    }

    pub fn fallbacks(&self) -> usize {
        self.outcomes.iter().map(|o| o.fallbacks).sum()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().map(|o| o.skipped).sum()
    }

    pub fn unprocessed(&self) -> usize {
        self.total_items - self.processed()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(WorkerOutcome::is_complete)
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|o| o.failure.is_some())
    }
}
