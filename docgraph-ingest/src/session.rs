//! The seams between the ingestion engine and the outside world: the store
//! it writes to and the compiler that renders items into statements.

use crate::error::StoreError;

/// How an item should be rendered into a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    #[default]
    Full,
    /// Replace free-text content with a fixed placeholder. Used for the
    /// single retry after the store rejected the full statement.
    IgnoreContent,
}

/// Renders one item into one store statement.
///
/// Implementations must be deterministic. An empty (or whitespace-only)
/// statement means "nothing to do for this item" and is skipped.
pub trait Compile<T>: Send + Sync {
    fn compile(&self, item: &T, mode: CompileMode) -> String;
}

/// A graph store that hands out independent sessions.
///
/// One store value is shared by every worker of an ingestion call; each
/// worker opens its own session on it. Closing a session is dropping it.
pub trait GraphStore: Send + Sync + 'static {
    type Session: Session;

    fn open_session(&self) -> Result<Self::Session, StoreError>;
}

pub trait Session {
    fn execute(&mut self, statement: &str) -> Result<(), StoreError>;
}
