//! Streaming prop reconciliation.
//!
//! Each panel instance receives complete replacement prop snapshots as the
//! backend emits progressively more complete structured output. This module
//! turns that jittery stream into a stable sequence of commits: diff against
//! the committed value, debounce, commit once per burst, highlight what
//! changed, then settle.
//!
//! Timers are deadlines checked by [`tick_instance`], and a deadline only
//! fires while the generation it was armed under is still current, so
//! disposal cancels by bumping the counter instead of racing a callback.

use serde_json::Value;
use tracing::trace;

use loom_base::{ComponentInstance, ReconcilePhase};

use crate::config::EngineConfig;
use crate::diff::changed_fields;

/// Outcome of feeding one snapshot to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Snapshot matched the committed value; nothing scheduled.
    Discarded,
    /// A commit was scheduled (or an already-pending commit re-armed).
    Scheduled,
}

/// Feed a new snapshot to a panel instance.
///
/// - unchanged vs. committed → discarded, timers untouched (idempotent);
/// - changed while `Settled` → enter `Loading`, arm the debounce;
/// - changed while `Loading` → replace the pending snapshot, recompute the
///   changed set against the *original* committed value, restart the
///   debounce (bursts coalesce into one commit);
/// - changed while `JustCommitted` → same as `Settled`, starting a new
///   cycle from the freshly committed value.
pub fn on_snapshot(
    instance: &mut ComponentInstance,
    snapshot: Value,
    now_ms: u64,
    config: &EngineConfig,
) -> SnapshotOutcome {
    let recon = &mut instance.reconciliation;
    let changed = changed_fields(&recon.committed, &snapshot);
    if changed.is_empty() {
        trace!(kind = %instance.kind, "unchanged snapshot discarded");
        return SnapshotOutcome::Discarded;
    }

    instance.props = snapshot.clone();
    recon.pending = Some(snapshot);
    recon.changed_fields = changed;
    recon.phase = ReconcilePhase::Loading;
    recon.commit_deadline_ms = Some(now_ms + config.commit_debounce_ms);
    recon.highlight_deadline_ms = None;
    recon.generation = recon.generation.wrapping_add(1);
    recon.armed_generation = recon.generation;
    SnapshotOutcome::Scheduled
}

/// Advance an instance's timers to `now_ms`. Returns `true` when a commit
/// fired (the owning thread's revision should bump so observers notice).
pub fn tick_instance(instance: &mut ComponentInstance, now_ms: u64, config: &EngineConfig) -> bool {
    let recon = &mut instance.reconciliation;
    // Deadlines armed under a superseded generation are dead.
    if recon.armed_generation != recon.generation {
        return false;
    }
    match recon.phase {
        ReconcilePhase::Loading => {
            let due = recon.commit_deadline_ms.is_some_and(|deadline| now_ms >= deadline);
            if !due {
                return false;
            }
            if let Some(pending) = recon.pending.take() {
                recon.committed = pending;
            }
            recon.commit_deadline_ms = None;
            recon.phase = ReconcilePhase::JustCommitted;
            recon.highlight_deadline_ms = Some(now_ms + config.highlight_ms);
            true
        }
        ReconcilePhase::JustCommitted => {
            let due = recon.highlight_deadline_ms.is_some_and(|deadline| now_ms >= deadline);
            if due {
                recon.highlight_deadline_ms = None;
                recon.changed_fields.clear();
                recon.phase = ReconcilePhase::Settled;
            }
            false
        }
        ReconcilePhase::Settled => false,
    }
}

/// Cancel an instance's pending timers. Called when the owning message is
/// destroyed (thread switch / new thread); no commit may fire afterwards.
/// The generation bump invalidates any armed deadline; the remaining
/// fields are reset so the instance reads as settled.
pub fn dispose(instance: &mut ComponentInstance) {
    let recon = &mut instance.reconciliation;
    recon.generation = recon.generation.wrapping_add(1);
    recon.pending = None;
    recon.commit_deadline_ms = None;
    recon.highlight_deadline_ms = None;
    recon.changed_fields.clear();
    recon.phase = ReconcilePhase::Settled;
}
