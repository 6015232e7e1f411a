// =============================================================================
// RECONCILIATION TIMING
// =============================================================================

/// Debounce before a pending snapshot commits (milliseconds). A burst of
/// snapshots inside this window coalesces into a single commit.
pub const COMMIT_DEBOUNCE_MS: u64 = 800;

/// How long committed fields stay highlighted after a commit (milliseconds)
pub const HIGHLIGHT_MS: u64 = 1_000;

// =============================================================================
// AUTO-SCROLL
// =============================================================================

/// Minimum gap between scroll requests while streaming (one per frame)
pub const SCROLL_FRAME_MS: u64 = 16;

/// Trailing delay that batches non-streaming revision bursts (milliseconds)
pub const SCROLL_BATCH_MS: u64 = 50;

// =============================================================================
// LAST-ACTIVE THREAD PERSISTENCE
// =============================================================================

/// Key prefix for the last-active-thread side channel
pub const SCOPE_KEY_PREFIX: &str = "thread:";

/// Scope used when the caller supplies none
pub const DEFAULT_SCOPE: &str = "default";
