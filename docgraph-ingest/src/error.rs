use thiserror::Error;

/// Failure reported by a store session while executing one statement.
///
/// Only [`StoreError::Syntax`] is recovered by the ingestion engine; every
/// other variant terminates the worker that hit it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Query syntax error: {0}")]
    Syntax(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, StoreError::Syntax(_))
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
