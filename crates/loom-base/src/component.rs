use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a panel instance sits in the snapshot-reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    #[default]
    Settled,
    Loading,
    JustCommitted,
}

/// Per-instance reconciliation state. Created on first prop arrival,
/// mutated only by the reconciler, destroyed with the owning message.
///
/// Timers are plain deadlines checked by the engine tick. A deadline only
/// fires while `armed_generation` still equals `generation`: scheduling
/// bumps both, disposal bumps `generation` alone, so cancellation is a
/// counter comparison and a stale deadline can never commit against a
/// disposed instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationState {
    /// Last accepted snapshot (or empty defaults before the first commit).
    pub committed: Value,
    /// Snapshot waiting behind the debounce timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Value>,
    /// Top-level fields that differ from the pre-burst committed value.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub changed_fields: BTreeSet<String>,
    #[serde(default)]
    pub phase: ReconcilePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_deadline_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_deadline_ms: Option<u64>,
    /// Bumped on every schedule and on disposal.
    #[serde(default)]
    pub generation: u64,
    /// Value of `generation` when the active deadlines were armed.
    #[serde(default)]
    pub armed_generation: u64,
}

/// One interactive panel attached to a single assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Panel type identifier (e.g. "graph_panel", "summary_panel").
    pub kind: String,
    /// Latest raw props snapshot from the stream. The reconciled value the
    /// UI renders lives in `reconciliation.committed`.
    #[serde(default)]
    pub props: Value,
    #[serde(default)]
    pub reconciliation: ReconciliationState,
}

impl ComponentInstance {
    pub fn new(kind: String) -> Self {
        Self {
            kind,
            props: Value::Object(serde_json::Map::new()),
            reconciliation: ReconciliationState {
                committed: Value::Object(serde_json::Map::new()),
                ..ReconciliationState::default()
            },
        }
    }
}
