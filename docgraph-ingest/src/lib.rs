pub mod error;
pub mod ingestor;
pub mod result;
pub mod session;

pub use error::{IngestError, StoreError};
pub use ingestor::{Ingestor, ProgressCallback, partition_sizes, split_into_parts};
pub use result::{IngestReport, WorkerFailure, WorkerOutcome};
pub use session::{Compile, CompileMode, GraphStore, Session};
