//! Two-phase ingestion of a whole graph: every node first, then every link,
//! so that link statements always find both of their endpoints.

use crate::cypher::{CompileOptions, Compiler, Verbatim, constraint_statements};
use crate::model::Graph;
use docgraph_ingest::{GraphStore, IngestError, IngestReport, Ingestor, WorkerFailure};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Constraints,
    Nodes,
    Links,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Constraints => "constraints",
            Phase::Nodes => "nodes",
            Phase::Links => "links",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called with `(phase, worker, items processed so far)`.
pub type PhaseProgressCallback = Arc<dyn Fn(Phase, usize, usize) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub concurrency: usize,
    pub compile: CompileOptions,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            compile: CompileOptions::default(),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_compile_options(mut self, compile: CompileOptions) -> Self {
        self.compile = compile;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphReport {
    pub nodes: IngestReport,
    pub links: IngestReport,
}

impl GraphReport {
    pub fn is_complete(&self) -> bool {
        self.nodes.is_complete() && self.links.is_complete()
    }

    pub fn phases(&self) -> [(Phase, &IngestReport); 2] {
        [(Phase::Nodes, &self.nodes), (Phase::Links, &self.links)]
    }
}

fn ingestor_for<S: GraphStore>(
    store: &Arc<S>,
    phase: Phase,
    progress: Option<&PhaseProgressCallback>,
) -> Ingestor<S> {
    let ingestor = Ingestor::new(store.clone());
    match progress {
        Some(callback) => {
            let callback = callback.clone();
            ingestor.with_progress_callback(Arc::new(move |worker: usize, processed: usize| {
                callback(phase, worker, processed)
            }))
        }
        None => ingestor,
    }
}

/// Install one uniqueness constraint on `id` per node kind.
///
/// Runs on a single worker. A store failure is returned as an error since
/// nothing downstream is safe without the constraints.
pub async fn install_constraints<S: GraphStore>(
    store: Arc<S>,
    progress: Option<PhaseProgressCallback>,
) -> Result<IngestReport, IngestError> {
    let report = ingestor_for(&store, Phase::Constraints, progress.as_ref())
        .ingest(constraint_statements(), Arc::new(Verbatim), 1)
        .await?;

    for outcome in report.failures() {
        match &outcome.failure {
            Some(WorkerFailure::Session(error)) | Some(WorkerFailure::Item { error, .. }) => {
                return Err(IngestError::Store(error.clone()));
            }
            _ => {}
        }
    }
    Ok(report)
}

/// Ingest `graph` into `store`: all nodes, then all links.
///
/// The link phase starts only once every node worker has finished. It runs
/// even when the node phase was partial; links whose endpoints are missing
/// match nothing and create nothing.
pub async fn ingest_graph<S: GraphStore>(
    store: Arc<S>,
    graph: Graph,
    config: &IngestConfig,
    progress: Option<PhaseProgressCallback>,
) -> Result<GraphReport, IngestError> {
    let (nodes, links) = graph.into_parts();
    let compiler = Arc::new(Compiler::new(config.compile.clone()));
    info!(
        "Ingesting graph: {} nodes, {} links, {} workers",
        nodes.len(),
        links.len(),
        config.concurrency
    );

    let nodes = ingestor_for(&store, Phase::Nodes, progress.as_ref())
        .ingest(nodes, compiler.clone(), config.concurrency)
        .await?;
    let links = ingestor_for(&store, Phase::Links, progress.as_ref())
        .ingest(links, compiler, config.concurrency)
        .await?;

    Ok(GraphReport { nodes, links })
}
