//! The synchronization engine: applies generation events to the thread
//! model, drives the stage machine, runs reconciliation timers, and
//! composes the history manager with the current-thread pointer.
//!
//! Everything here runs on the host's event loop. Mutation entry points
//! execute to completion; timers are deadlines fired by [`Engine::tick`].

use tracing::{debug, warn};

use loom_base::{ActionType, EngineError, GenerationStage, MessageRole, ScopeStore, Thread, ThreadSource};

use crate::config::EngineConfig;
use crate::events::{EventEnvelope, GenerationEvent};
use crate::history::ThreadHistory;
use crate::reconcile::{self, SnapshotOutcome};
use crate::scroll::{ScrollCoordinator, ScrollRequest};
use crate::state::EngineState;

pub struct Engine<S: ThreadSource, K: ScopeStore> {
    pub config: EngineConfig,
    pub state: EngineState,
    pub history: ThreadHistory<S, K>,
    scroll: ScrollCoordinator,
    /// Logical scope for last-active persistence (feature area); `None`
    /// falls back to the configured sentinel.
    scope: Option<String>,
}

impl<S: ThreadSource, K: ScopeStore> Engine<S, K> {
    pub fn new(source: S, store: K, config: EngineConfig) -> Self {
        Self {
            config,
            state: EngineState::default(),
            history: ThreadHistory::new(source, store),
            scroll: ScrollCoordinator::new(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Restore the previous session's thread from the side channel. Called
    /// once at startup; `Ok(None)` means nothing was persisted.
    pub fn resume_last_active(&mut self) -> Result<Option<String>, EngineError> {
        let Some(id) = self.history.load_last_active(&self.config, self.scope()) else {
            return Ok(None);
        };
        self.history.list(None)?;
        self.switch_thread(&id)?;
        Ok(Some(id))
    }

    /// Apply one inbound event. Stale events (the envelope's thread is no
    /// longer current at application time) are dropped and reported as
    /// `StaleUpdate`; nothing is mutated. Invalid stage transitions are
    /// ignored with a warning — the machine only moves along its legal
    /// order. A transition to `Error` is applied, attaches the failure to
    /// the in-flight message, and is reported as `Generation`.
    pub fn apply(&mut self, envelope: EventEnvelope, now_ms: u64) -> Result<(), EngineError> {
        let EventEnvelope { thread_id, event } = envelope;
        if self.state.current_id.as_deref() != Some(thread_id.as_str()) {
            debug!(thread_id, "dropping event for non-current thread");
            return Err(EngineError::StaleUpdate { thread_id });
        }

        match event {
            GenerationEvent::StageChanged(next) => {
                if !self.state.stage.allows_transition_to(next) {
                    warn!(from = ?self.state.stage, to = ?next, "ignoring invalid stage transition");
                    return Ok(());
                }
                self.state.stage = next;
                match next {
                    GenerationStage::Complete => self.state.in_flight_message_id = None,
                    GenerationStage::Error => {
                        let err = EngineError::Generation("response generation failed".to_string());
                        self.mark_generation_error(&thread_id, &err);
                        return Err(err);
                    }
                    _ => {}
                }
            }
            GenerationEvent::ContentDelta { message_id, delta } => {
                let last_id = self
                    .state
                    .thread(&thread_id)
                    .and_then(|t| t.messages.last())
                    .map(|m| m.id.clone())
                    .ok_or_else(|| EngineError::NotFound(format!("thread {} has no messages", thread_id)))?;
                if last_id != message_id {
                    return Err(EngineError::NotFound(format!("streaming message {}", message_id)));
                }
                self.state.mutate_last_message_content(&thread_id, &delta)?;
                self.note_revision(now_ms);
            }
            GenerationEvent::MessageAppended(message) => {
                let in_flight = (self.state.stage.is_busy()
                    && message.role == MessageRole::Assistant
                    && message.action_type == ActionType::Normal)
                    .then(|| message.id.clone());
                self.state.append(&thread_id, message)?;
                if in_flight.is_some() {
                    self.state.in_flight_message_id = in_flight;
                }
                self.note_revision(now_ms);
            }
            GenerationEvent::ComponentPropsSnapshot { message_id, props } => {
                let config = &self.config;
                let thread = self
                    .state
                    .thread_mut(&thread_id)
                    .ok_or_else(|| EngineError::NotFound(format!("thread {}", thread_id)))?;
                let message = thread
                    .messages
                    .iter_mut()
                    .find(|m| m.id == message_id)
                    .ok_or_else(|| EngineError::NotFound(format!("message {}", message_id)))?;
                let instance = message
                    .component
                    .as_mut()
                    .ok_or_else(|| EngineError::NotFound(format!("component on message {}", message_id)))?;
                if reconcile::on_snapshot(instance, props, now_ms, config) == SnapshotOutcome::Scheduled {
                    thread.bump_revision();
                    self.note_revision(now_ms);
                }
            }
        }
        Ok(())
    }

    /// Fire due reconciliation timers for the current thread's panel
    /// instances. Commits bump the thread revision (so auto-scroll and
    /// render caches notice).
    pub fn tick(&mut self, now_ms: u64) {
        let config = &self.config;
        let mut committed = 0;
        if let Some(thread) = self.state.current_mut() {
            for message in &mut thread.messages {
                if let Some(instance) = message.component.as_mut()
                    && reconcile::tick_instance(instance, now_ms, config)
                {
                    committed += 1;
                }
            }
            if committed > 0 {
                thread.bump_revision();
            }
        }
        if committed > 0 {
            self.note_revision(now_ms);
        }
    }

    /// Drain one advisory scroll request, if due.
    pub fn take_scroll_request(&mut self, now_ms: u64) -> Option<ScrollRequest> {
        self.scroll.take_request(now_ms, &self.config)
    }

    /// User-initiated cancel: force the stage to `Idle` and mark the
    /// in-flight assistant message cancelled, keeping its partial content.
    /// A turn cancelled before its assistant message was appended has
    /// nothing to mark; earlier turns' messages are never touched.
    /// Idempotent — cancelling twice, or after natural completion, is a
    /// no-op.
    pub fn cancel(&mut self, now_ms: u64) {
        if !self.state.stage.is_busy() {
            return;
        }
        self.state.stage = GenerationStage::Idle;
        let in_flight = self.state.in_flight_message_id.take();
        if let Some(thread) = self.state.current_mut() {
            if let Some(id) = in_flight
                && let Some(message) = thread.messages.iter_mut().find(|m| m.id == id)
            {
                message.is_cancelled = true;
            }
            thread.bump_revision();
        }
        self.note_revision(now_ms);
    }

    /// Reset a terminal stage to `Idle` ahead of the next user submission.
    pub fn begin_submission(&mut self) {
        if self.state.stage.is_terminal() {
            self.state.stage = GenerationStage::Idle;
        }
    }

    /// Switch to a known thread. Atomic: on failure the pointer, stage and
    /// timers are untouched.
    pub fn switch_thread(&mut self, id: &str) -> Result<(), EngineError> {
        let thread = self.history.switch_to(id)?;
        self.install_thread(thread);
        Ok(())
    }

    /// Create a fresh thread through the source and make it current.
    pub fn start_new_thread(&mut self) -> Result<String, EngineError> {
        let thread = self.history.create()?;
        let id = thread.id.clone();
        self.install_thread(thread);
        Ok(id)
    }

    /// Install `thread` as current: cancel the outgoing thread's pending
    /// reconciliation timers, drop pending scroll intent, reset the stage,
    /// persist the selection.
    fn install_thread(&mut self, thread: Thread) {
        if let Some(outgoing) = self.state.current_mut() {
            for message in &mut outgoing.messages {
                if let Some(instance) = message.component.as_mut() {
                    reconcile::dispose(instance);
                }
            }
        }
        self.scroll.reset();
        let id = thread.id.clone();
        self.state.set_current(thread);
        self.state.stage = GenerationStage::Idle;
        self.state.in_flight_message_id = None;
        self.history.persist_last_active(&self.config, self.scope.as_deref(), &id);
    }

    fn note_revision(&mut self, now_ms: u64) {
        let Some(thread) = self.state.current() else { return };
        self.scroll.on_revision(thread.revision, self.state.stage, now_ms, &self.config);
    }

    /// Attach an inline generation error to the in-flight assistant
    /// message. Partial content already committed stays. A turn that
    /// failed before its assistant message was appended has no message to
    /// mark, and earlier turns' messages are never touched.
    fn mark_generation_error(&mut self, thread_id: &str, err: &EngineError) {
        let Some(id) = self.state.in_flight_message_id.take() else { return };
        if let Some(thread) = self.state.thread_mut(thread_id) {
            if let Some(message) = thread.messages.iter_mut().find(|m| m.id == id) {
                message.error = Some(err.to_string());
            }
            thread.bump_revision();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use loom_base::message::test_helpers::MessageBuilder;
    use loom_base::{ComponentInstance, ReconcilePhase, SourceError, ThreadListEntry};

    use crate::persistence::MemoryScopeStore;

    use super::*;

    struct FakeSource {
        threads: Vec<Thread>,
        next_id: usize,
    }

    impl FakeSource {
        fn with_threads(ids: &[&str]) -> Self {
            Self { threads: ids.iter().map(|id| Thread::new(id.to_string())).collect(), next_id: 0 }
        }
    }

    impl ThreadSource for FakeSource {
        fn fetch(&mut self, _filter: Option<&str>) -> Result<Vec<ThreadListEntry>, SourceError> {
            Ok(self.threads.iter().map(|t| t.entry()).collect())
        }

        fn create(&mut self) -> Result<Thread, SourceError> {
            self.next_id += 1;
            let thread = Thread::new(format!("new-{}", self.next_id));
            self.threads.push(thread.clone());
            Ok(thread)
        }

        fn switch(&mut self, id: &str) -> Result<Thread, SourceError> {
            self.threads.iter().find(|t| t.id == id).cloned().ok_or_else(|| SourceError::NotFound(id.to_string()))
        }
    }

    fn engine_on(ids: &[&str], current: &str) -> Engine<FakeSource, MemoryScopeStore> {
        let config = EngineConfig { commit_debounce_ms: 100, highlight_ms: 50, ..EngineConfig::default() };
        let mut engine = Engine::new(FakeSource::with_threads(ids), MemoryScopeStore::default(), config);
        engine.history.list(None).unwrap();
        engine.switch_thread(current).unwrap();
        engine
    }

    fn envelope(thread_id: &str, event: GenerationEvent) -> EventEnvelope {
        EventEnvelope::new(thread_id, event)
    }

    #[test]
    fn events_for_non_current_thread_are_dropped() {
        let mut engine = engine_on(&["a", "b"], "b");
        let err = engine
            .apply(envelope("a", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0)
            .unwrap_err();
        assert_eq!(err, EngineError::StaleUpdate { thread_id: "a".to_string() });
        assert_eq!(engine.state.stage, GenerationStage::Idle);
    }

    #[test]
    fn stage_follows_the_legal_order_and_ignores_skips() {
        let mut engine = engine_on(&["t"], "t");

        // Skipping ahead from Idle is ignored.
        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::StreamingResponse)), 0).unwrap();
        assert_eq!(engine.state.stage, GenerationStage::Idle);

        for stage in [
            GenerationStage::ChoosingComponent,
            GenerationStage::FetchingContext,
            GenerationStage::HydratingComponent,
            GenerationStage::StreamingResponse,
            GenerationStage::Complete,
        ] {
            engine.apply(envelope("t", GenerationEvent::StageChanged(stage)), 0).unwrap();
            assert_eq!(engine.state.stage, stage);
        }
    }

    #[test]
    fn delta_streams_into_the_terminal_message() {
        let mut engine = engine_on(&["t"], "t");
        let message = MessageBuilder::assistant("").id("a1").build();
        engine.apply(envelope("t", GenerationEvent::MessageAppended(message)), 0).unwrap();

        for delta in ["Hel", "lo"] {
            engine
                .apply(
                    envelope(
                        "t",
                        GenerationEvent::ContentDelta { message_id: "a1".to_string(), delta: delta.to_string() },
                    ),
                    0,
                )
                .unwrap();
        }
        assert_eq!(engine.state.current().unwrap().messages[0].content.plain_text(), "Hello");
    }

    #[test]
    fn delta_for_non_terminal_message_is_not_found() {
        let mut engine = engine_on(&["t"], "t");
        engine
            .apply(envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("x").id("a1").build())), 0)
            .unwrap();
        engine
            .apply(envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("y").id("a2").build())), 0)
            .unwrap();

        let err = engine
            .apply(
                envelope("t", GenerationEvent::ContentDelta { message_id: "a1".to_string(), delta: "!".to_string() }),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn snapshot_flows_through_reconciliation_to_commit() {
        let mut engine = engine_on(&["t"], "t");
        let message = MessageBuilder::assistant("")
            .id("a1")
            .component(ComponentInstance::new("graph_panel".to_string()))
            .build();
        engine.apply(envelope("t", GenerationEvent::MessageAppended(message)), 0).unwrap();

        engine
            .apply(
                envelope(
                    "t",
                    GenerationEvent::ComponentPropsSnapshot {
                        message_id: "a1".to_string(),
                        props: json!({"title": "Q1"}),
                    },
                ),
                0,
            )
            .unwrap();

        engine.tick(100);
        let instance = engine.state.current().unwrap().messages[0].component.as_ref().unwrap();
        assert_eq!(instance.reconciliation.committed, json!({"title": "Q1"}));
        assert_eq!(instance.reconciliation.phase, ReconcilePhase::JustCommitted);
    }

    #[test]
    fn snapshot_for_component_free_message_is_not_found() {
        let mut engine = engine_on(&["t"], "t");
        engine
            .apply(envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("").id("a1").build())), 0)
            .unwrap();
        let err = engine
            .apply(
                envelope(
                    "t",
                    GenerationEvent::ComponentPropsSnapshot { message_id: "a1".to_string(), props: json!({}) },
                ),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn switch_mid_debounce_never_commits_against_the_old_instance() {
        let mut engine = engine_on(&["t", "u"], "t");
        let message = MessageBuilder::assistant("")
            .id("a1")
            .component(ComponentInstance::new("summary_panel".to_string()))
            .build();
        engine.apply(envelope("t", GenerationEvent::MessageAppended(message)), 0).unwrap();
        engine
            .apply(
                envelope(
                    "t",
                    GenerationEvent::ComponentPropsSnapshot {
                        message_id: "a1".to_string(),
                        props: json!({"bullet_points": ["a"]}),
                    },
                ),
                0,
            )
            .unwrap();

        // Switch away while the commit is pending, then tick far past the
        // old deadline.
        engine.switch_thread("u").unwrap();
        engine.tick(10_000);

        let old = engine.state.thread("t").unwrap();
        let instance = old.messages[0].component.as_ref().unwrap();
        assert_eq!(instance.reconciliation.committed, json!({}));
        assert_eq!(instance.reconciliation.phase, ReconcilePhase::Settled);
        assert!(instance.reconciliation.pending.is_none());
    }

    #[test]
    fn cancel_is_idempotent_and_keeps_partial_content() {
        let mut engine = engine_on(&["t"], "t");
        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0).unwrap();
        engine
            .apply(
                envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("partial").id("a1").build())),
                0,
            )
            .unwrap();

        engine.cancel(0);
        assert_eq!(engine.state.stage, GenerationStage::Idle);
        let message = &engine.state.current().unwrap().messages[0];
        assert!(message.is_cancelled);
        assert_eq!(message.content.plain_text(), "partial");

        // Second cancel and cancel-after-completion are no-ops.
        engine.cancel(1);
        assert_eq!(engine.state.stage, GenerationStage::Idle);
        engine.state.stage = GenerationStage::Complete;
        engine.cancel(2);
        assert_eq!(engine.state.stage, GenerationStage::Complete);
    }

    #[test]
    fn cancellation_resets_from_any_busy_stage() {
        for stage in [
            GenerationStage::ChoosingComponent,
            GenerationStage::FetchingContext,
            GenerationStage::HydratingComponent,
            GenerationStage::StreamingResponse,
        ] {
            let mut engine = engine_on(&["t"], "t");
            engine.state.stage = stage;
            engine.cancel(0);
            assert_eq!(engine.state.stage, GenerationStage::Idle);
        }
    }

    #[test]
    fn begin_submission_resets_terminal_stages_only() {
        let mut engine = engine_on(&["t"], "t");
        engine.state.stage = GenerationStage::Complete;
        engine.begin_submission();
        assert_eq!(engine.state.stage, GenerationStage::Idle);

        engine.state.stage = GenerationStage::StreamingResponse;
        engine.begin_submission();
        assert_eq!(engine.state.stage, GenerationStage::StreamingResponse);
    }

    #[test]
    fn failed_switch_leaves_the_pointer_alone() {
        let mut engine = engine_on(&["t"], "t");
        let err = engine.switch_thread("missing").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(engine.state.current_id.as_deref(), Some("t"));
    }

    #[test]
    fn switch_persists_last_active_for_resume() {
        let mut engine = engine_on(&["t", "u"], "t");
        engine.switch_thread("u").unwrap();
        let stored = engine.history.load_last_active(&engine.config, None);
        assert_eq!(stored.as_deref(), Some("u"));

        // A new engine over the same store resumes thread u.
        let config = engine.config.clone();
        let mut resumed = Engine::new(FakeSource::with_threads(&["t", "u"]), MemoryScopeStore::default(), config);
        let cfg = resumed.config.clone();
        resumed.history.persist_last_active(&cfg, None, "u");
        let restored = resumed.resume_last_active().unwrap();
        assert_eq!(restored.as_deref(), Some("u"));
        assert_eq!(resumed.state.current_id.as_deref(), Some("u"));
    }

    #[test]
    fn start_new_thread_switches_and_resets_stage() {
        let mut engine = engine_on(&["t"], "t");
        engine.state.stage = GenerationStage::Complete;
        let id = engine.start_new_thread().unwrap();
        assert_eq!(engine.state.current_id.as_deref(), Some(id.as_str()));
        assert_eq!(engine.state.stage, GenerationStage::Idle);
    }

    #[test]
    fn generation_error_is_surfaced_inline_and_keeps_content() {
        let mut engine = engine_on(&["t"], "t");
        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0).unwrap();
        engine
            .apply(
                envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("partial").id("a1").build())),
                0,
            )
            .unwrap();

        let err = engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::Error)), 0).unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
        assert_eq!(engine.state.stage, GenerationStage::Error);
        let message = &engine.state.current().unwrap().messages[0];
        assert!(message.error.is_some());
        assert_eq!(message.content.plain_text(), "partial");
    }

    #[test]
    fn cancel_before_the_new_turn_message_leaves_prior_turns_alone() {
        let mut engine = engine_on(&["t"], "t");

        // A full first turn, completed naturally.
        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0).unwrap();
        engine
            .apply(envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("done").id("a1").build())), 0)
            .unwrap();
        for stage in [
            GenerationStage::FetchingContext,
            GenerationStage::HydratingComponent,
            GenerationStage::StreamingResponse,
            GenerationStage::Complete,
        ] {
            engine.apply(envelope("t", GenerationEvent::StageChanged(stage)), 0).unwrap();
        }

        // Second turn starts, then the user cancels before its assistant
        // message was appended.
        engine.begin_submission();
        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0).unwrap();
        engine.cancel(0);

        assert_eq!(engine.state.stage, GenerationStage::Idle);
        let previous = &engine.state.current().unwrap().messages[0];
        assert!(!previous.is_cancelled);
    }

    #[test]
    fn error_before_the_new_turn_message_leaves_prior_turns_alone() {
        let mut engine = engine_on(&["t"], "t");

        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0).unwrap();
        engine
            .apply(envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("done").id("a1").build())), 0)
            .unwrap();
        for stage in [
            GenerationStage::FetchingContext,
            GenerationStage::HydratingComponent,
            GenerationStage::StreamingResponse,
            GenerationStage::Complete,
        ] {
            engine.apply(envelope("t", GenerationEvent::StageChanged(stage)), 0).unwrap();
        }

        // Next turn fails before its assistant message exists.
        engine.begin_submission();
        engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::ChoosingComponent)), 0).unwrap();
        let err = engine.apply(envelope("t", GenerationEvent::StageChanged(GenerationStage::Error)), 0).unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));

        let previous = &engine.state.current().unwrap().messages[0];
        assert!(previous.error.is_none());
    }

    #[test]
    fn streaming_revisions_produce_scroll_requests() {
        let mut engine = engine_on(&["t"], "t");
        for stage in [
            GenerationStage::ChoosingComponent,
            GenerationStage::FetchingContext,
            GenerationStage::HydratingComponent,
            GenerationStage::StreamingResponse,
        ] {
            engine.apply(envelope("t", GenerationEvent::StageChanged(stage)), 0).unwrap();
        }
        engine
            .apply(envelope("t", GenerationEvent::MessageAppended(MessageBuilder::assistant("").id("a1").build())), 0)
            .unwrap();
        assert_eq!(engine.take_scroll_request(0), Some(crate::scroll::ScrollRequest::ToEnd));
        assert_eq!(engine.take_scroll_request(1), None);
    }
}
