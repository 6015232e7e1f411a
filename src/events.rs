use serde_json::Value;

use loom_base::{GenerationStage, Message};

/// One event from the generation stream. Events for a given thread arrive
/// in emission order; cross-thread interleaving is possible and is filtered
/// by the engine against the current-thread pointer at application time.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// The backend moved to a new stage.
    StageChanged(GenerationStage),
    /// More text for the thread's terminal (streaming) message.
    ContentDelta { message_id: String, delta: String },
    /// A complete new message (user echo, tool call, tool response, or a
    /// fresh assistant message to stream into).
    MessageAppended(Message),
    /// A complete replacement prop snapshot for the panel attached to
    /// `message_id`. Not a delta.
    ComponentPropsSnapshot { message_id: String, props: Value },
}

/// A generation event tagged with the thread it belongs to.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub thread_id: String,
    pub event: GenerationEvent,
}

impl EventEnvelope {
    pub fn new(thread_id: impl Into<String>, event: GenerationEvent) -> Self {
        Self { thread_id: thread_id.into(), event }
    }
}
