//! Thread history: list, create, switch, and last-active persistence.
//!
//! Wraps the external thread-list source and the opaque side channel. The
//! cached list is last-known-good: a transport failure surfaces a retryable
//! error and leaves the cache untouched.

use tracing::warn;

use loom_base::{EngineError, ScopeStore, SourceError, Thread, ThreadListEntry, ThreadSource};

use crate::config::EngineConfig;

fn to_engine_error(err: SourceError) -> EngineError {
    match err {
        SourceError::Transport(msg) => EngineError::Transport(msg),
        SourceError::NotFound(id) => EngineError::NotFound(format!("thread {}", id)),
    }
}

/// Case-insensitive substring match against a thread's id and label. An
/// empty filter matches everything.
pub fn matches_filter(entry: &ThreadListEntry, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    let needle = filter.to_lowercase();
    if entry.id.to_lowercase().contains(&needle) {
        return true;
    }
    entry.label.as_deref().is_some_and(|label| label.to_lowercase().contains(&needle))
}

pub struct ThreadHistory<S: ThreadSource, K: ScopeStore> {
    source: S,
    store: K,
    /// Last successfully fetched entries, most recent first.
    entries: Vec<ThreadListEntry>,
    /// Last transport failure, cleared by the next successful fetch.
    last_error: Option<EngineError>,
}

impl<S: ThreadSource, K: ScopeStore> ThreadHistory<S, K> {
    pub fn new(source: S, store: K) -> Self {
        Self { source, store, entries: Vec::new(), last_error: None }
    }

    /// Fetch entries through the source and return them filtered and
    /// ordered most-recent-first. On transport failure the cached list is
    /// kept and the error is returned (retryable).
    pub fn list(&mut self, filter: Option<&str>) -> Result<Vec<ThreadListEntry>, EngineError> {
        match self.source.fetch(filter) {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.entries = entries;
                self.last_error = None;
            }
            Err(err) => {
                let err = to_engine_error(err);
                warn!(error = %err, "thread list fetch failed; keeping last-known-good list");
                self.last_error = Some(err.clone());
                return Err(err);
            }
        }
        let filter = filter.unwrap_or("");
        Ok(self.entries.iter().filter(|e| matches_filter(e, filter)).cloned().collect())
    }

    /// Entries from the last successful fetch.
    pub fn cached_entries(&self) -> &[ThreadListEntry] {
        &self.entries
    }

    pub fn last_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }

    /// Create a fresh thread through the source and cache its entry.
    pub fn create(&mut self) -> Result<Thread, EngineError> {
        let thread = self.source.create().map_err(to_engine_error)?;
        self.entries.insert(0, thread.entry());
        Ok(thread)
    }

    /// Load the full thread for `id`. Fails with `NotFound` when `id` is
    /// absent from the current cached list — recoverable; the caller
    /// refetches and retries.
    pub fn switch_to(&mut self, id: &str) -> Result<Thread, EngineError> {
        if !self.entries.iter().any(|e| e.id == id) {
            return Err(EngineError::NotFound(format!("thread {}", id)));
        }
        self.source.switch(id).map_err(to_engine_error)
    }

    /// Overwrite the last-active thread id for a scope.
    pub fn persist_last_active(&mut self, config: &EngineConfig, scope: Option<&str>, thread_id: &str) {
        self.store.set(&config.scope_key(scope), thread_id);
    }

    /// Read the last-active thread id persisted for a scope, if any.
    /// Read once at startup to restore the previous session's thread.
    pub fn load_last_active(&self, config: &EngineConfig, scope: Option<&str>) -> Option<String> {
        self.store.get(&config.scope_key(scope))
    }
}
