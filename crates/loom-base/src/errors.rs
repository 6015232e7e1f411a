use thiserror::Error;

/// Engine errors. Operations either fully apply or fully reject; no error
/// in one thread's processing may affect another thread's state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Referenced thread or message is absent. Recoverable; surfaced to the
    /// caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// Event targets a thread that is no longer current. Dropped and
    /// reported, never surfaced to the user.
    #[error("stale update for thread {thread_id}")]
    StaleUpdate { thread_id: String },

    /// Thread-list fetch/switch/create failed. Retryable; the history list
    /// stays in its last-known-good state.
    #[error("transport error: {0}")]
    Transport(String),

    /// The stage machine reached `Error`. Surfaced inline on the affected
    /// message; partial content is kept.
    #[error("generation error: {0}")]
    Generation(String),
}
