pub mod cypher;
pub mod error;
pub mod html;
pub mod ids;
pub mod json;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod statement;
pub mod store;
pub mod traffic;

pub use cypher::{CompileOptions, Compiler, EscapePolicy, PLACEHOLDER};
pub use error::{ConversionError, ModelError, SourceError};
pub use ids::{CounterIds, Id, IdSource, UuidIds};
pub use model::{Graph, Link, LinkType, Node, NodeKind, ScalarType};
pub use pipeline::{GraphReport, IngestConfig, Phase, PhaseProgressCallback};
pub use source::{Document, DocumentFormat, DocumentSource};
pub use store::{SqliteGraphStore, StoreStats};
