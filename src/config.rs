use crate::constants::{
    COMMIT_DEBOUNCE_MS, DEFAULT_SCOPE, HIGHLIGHT_MS, SCOPE_KEY_PREFIX, SCROLL_BATCH_MS, SCROLL_FRAME_MS,
};

/// Engine timing and persistence policy. All values are UI policy, not
/// correctness requirements; tests shrink them freely.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Debounce before a pending prop snapshot commits (ms).
    pub commit_debounce_ms: u64,
    /// Highlight duration for just-committed fields (ms).
    pub highlight_ms: u64,
    /// Minimum gap between scroll requests while streaming (ms).
    pub scroll_frame_ms: u64,
    /// Trailing delay batching non-streaming scroll requests (ms).
    pub scroll_batch_ms: u64,
    /// Key prefix for the last-active-thread side channel.
    pub scope_key_prefix: String,
    /// Scope used when the caller supplies none.
    pub default_scope: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commit_debounce_ms: COMMIT_DEBOUNCE_MS,
            highlight_ms: HIGHLIGHT_MS,
            scroll_frame_ms: SCROLL_FRAME_MS,
            scroll_batch_ms: SCROLL_BATCH_MS,
            scope_key_prefix: SCOPE_KEY_PREFIX.to_string(),
            default_scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Full side-channel key for a scope ("thread:default" when no scope is
    /// given).
    pub fn scope_key(&self, scope: Option<&str>) -> String {
        format!("{}{}", self.scope_key_prefix, scope.unwrap_or(&self.default_scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_key_uses_default_sentinel() {
        let config = EngineConfig::default();
        assert_eq!(config.scope_key(None), "thread:default");
        assert_eq!(config.scope_key(Some("sidebar")), "thread:sidebar");
    }
}
