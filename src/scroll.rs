//! Scroll intent derived from revision changes and the generation stage.
//!
//! Requests are advisory to the presentation layer; they never block or
//! fail. Nothing here touches layout — it is pure timing policy.

use loom_base::GenerationStage;

use crate::config::EngineConfig;

/// Advisory scroll request for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRequest {
    ToEnd,
}

/// Coalesces revision changes into scroll requests.
///
/// While the stage is `StreamingResponse` every revision requests a scroll,
/// throttled to one request per frame interval. Otherwise a revision arms a
/// trailing deadline that re-arms on each further revision, so a burst of
/// appended messages produces a single request.
#[derive(Debug, Default)]
pub struct ScrollCoordinator {
    immediate_pending: bool,
    last_emit_ms: Option<u64>,
    batch_deadline_ms: Option<u64>,
    last_seen_revision: Option<u64>,
}

impl ScrollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a thread revision. Call whenever the observed revision counter
    /// moved; repeated calls with the same revision are ignored.
    pub fn on_revision(&mut self, revision: u64, stage: GenerationStage, now_ms: u64, config: &EngineConfig) {
        if self.last_seen_revision == Some(revision) {
            return;
        }
        self.last_seen_revision = Some(revision);

        if stage == GenerationStage::StreamingResponse {
            self.immediate_pending = true;
            self.batch_deadline_ms = None;
        } else {
            self.batch_deadline_ms = Some(now_ms + config.scroll_batch_ms);
        }
    }

    /// Drain one scroll request if due.
    pub fn take_request(&mut self, now_ms: u64, config: &EngineConfig) -> Option<ScrollRequest> {
        if self.immediate_pending {
            let frame_elapsed =
                self.last_emit_ms.is_none_or(|last| now_ms.saturating_sub(last) >= config.scroll_frame_ms);
            if frame_elapsed {
                self.immediate_pending = false;
                self.last_emit_ms = Some(now_ms);
                return Some(ScrollRequest::ToEnd);
            }
            return None;
        }
        if self.batch_deadline_ms.is_some_and(|deadline| now_ms >= deadline) {
            self.batch_deadline_ms = None;
            self.last_emit_ms = Some(now_ms);
            return Some(ScrollRequest::ToEnd);
        }
        None
    }

    /// Forget pending intent. Called on thread switch so requests scheduled
    /// for the old thread's content never fire against the new one.
    pub fn reset(&mut self) {
        self.immediate_pending = false;
        self.batch_deadline_ms = None;
        self.last_seen_revision = None;
    }
}
