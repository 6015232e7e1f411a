use tracing::debug;

use loom_base::{EngineError, GenerationStage, Message, Thread};

/// Runtime state: every thread visited this session, the single
/// current-thread pointer, and the generation stage of the current thread.
///
/// All mutation entry points run to completion on one thread (cooperative
/// event-loop model), so there is no internal locking. Components that react
/// to events read `current_id` at the moment of event application, which is
/// what lets stale cross-thread updates be dropped.
#[derive(Debug, Default)]
pub struct EngineState {
    pub threads: Vec<Thread>,
    pub current_id: Option<String>,
    pub stage: GenerationStage,
    /// Id of the assistant message the current turn streams into. Set when
    /// a normal assistant message is appended while the stage is busy;
    /// cleared on terminal stages, cancel, and thread switch. Mutations
    /// targeting "the in-flight message" (cancel marks, inline generation
    /// errors) go through this id, never through message order.
    pub in_flight_message_id: Option<String>,
}

impl EngineState {
    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn thread_mut(&mut self, thread_id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == thread_id)
    }

    pub fn current(&self) -> Option<&Thread> {
        self.current_id.as_deref().and_then(|id| self.thread(id))
    }

    pub fn current_mut(&mut self) -> Option<&mut Thread> {
        let id = self.current_id.clone()?;
        self.thread_mut(&id)
    }

    fn is_current(&self, thread_id: &str) -> bool {
        self.current_id.as_deref() == Some(thread_id)
    }

    /// Install `thread`, replacing any previously loaded copy with the same
    /// id, and make it current.
    pub fn set_current(&mut self, thread: Thread) {
        self.threads.retain(|t| t.id != thread.id);
        self.current_id = Some(thread.id.clone());
        self.threads.push(thread);
    }

    /// Append a message to a known thread. Works on any loaded thread, not
    /// just the current one; unknown ids fail with `NotFound`.
    pub fn append(&mut self, thread_id: &str, message: Message) -> Result<(), EngineError> {
        let thread = self
            .thread_mut(thread_id)
            .ok_or_else(|| EngineError::NotFound(format!("thread {}", thread_id)))?;
        thread.messages.push(message);
        thread.bump_revision();
        Ok(())
    }

    /// Append a streamed delta to the terminal message of `thread_id`.
    ///
    /// Deltas from a superseded stream (thread no longer current) are
    /// rejected with `StaleUpdate` before anything is touched — reported to
    /// the caller, never applied, so a newer thread's view cannot be
    /// corrupted. `NotFound` covers an unknown thread or an empty message
    /// list.
    pub fn mutate_last_message_content(&mut self, thread_id: &str, delta: &str) -> Result<(), EngineError> {
        if !self.is_current(thread_id) {
            debug!(thread_id, "dropping stale content delta");
            return Err(EngineError::StaleUpdate { thread_id: thread_id.to_string() });
        }
        let thread = self
            .thread_mut(thread_id)
            .ok_or_else(|| EngineError::NotFound(format!("thread {}", thread_id)))?;
        let message = thread
            .messages
            .last_mut()
            .ok_or_else(|| EngineError::NotFound(format!("thread {} has no messages", thread_id)))?;
        message.content.append_delta(delta);
        thread.bump_revision();
        Ok(())
    }
}
