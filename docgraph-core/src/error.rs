use thiserror::Error;

/// A document could not be turned into a graph.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Invalid JSON document: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid traffic records: {0}")]
    InvalidTraffic(#[source] serde_json::Error),
}

/// An in-memory graph breaks one of its structural invariants.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),

    #[error("Link {link} refers to unknown node {endpoint}")]
    DanglingLink { link: String, endpoint: String },

    #[error("Graph contains a cycle")]
    Cycle,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
