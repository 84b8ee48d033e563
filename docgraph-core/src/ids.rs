//! Identifier sources for nodes and links.
//!
//! Walkers never mint identifiers themselves; they draw them from an
//! [`IdSource`] handed in by the caller. Production runs use random UUIDs,
//! tests use a counter so they can assert on exact identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub trait IdSource {
    fn next_id(&mut self) -> Id;
}

impl<I: IdSource + ?Sized> IdSource for &mut I {
    fn next_id(&mut self) -> Id {
        (**self).next_id()
    }
}

/// Random v4 UUIDs; unique across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self) -> Id {
        Id(Uuid::new_v4().to_string())
    }
}

/// Monotonic counter: `prefix0`, `prefix1`, ...
/// Only unique within one run, so only safe against an empty store.
#[derive(Debug, Clone, Default)]
pub struct CounterIds {
    prefix: String,
    next: u64,
}

impl CounterIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

impl IdSource for CounterIds {
    fn next_id(&mut self) -> Id {
        let id = Id(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}
