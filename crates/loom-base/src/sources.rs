use thiserror::Error;

use crate::thread::{Thread, ThreadListEntry};

/// Failures reported by a thread-list data source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("thread not found: {0}")]
    NotFound(String),
}

/// The external thread-list data source ("the service"). Network-backed in
/// production; in-memory in tests.
pub trait ThreadSource {
    /// Fetch thread entries, optionally filtered server-side.
    fn fetch(&mut self, filter: Option<&str>) -> Result<Vec<ThreadListEntry>, SourceError>;

    /// Create a fresh thread and return it in full.
    fn create(&mut self) -> Result<Thread, SourceError>;

    /// Load the full thread for `id`.
    fn switch(&mut self, id: &str) -> Result<Thread, SourceError>;
}

/// Opaque key-value side channel for persisting small selections (one entry
/// per logical scope, overwritten on every write).
pub trait ScopeStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}
