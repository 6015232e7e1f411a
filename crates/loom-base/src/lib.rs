//! Shared data model and contracts for the loom engine.
//!
//! - `message` — MessageRole, ActionType, MessageContent, Message
//! - `thread` — Thread, ThreadListEntry
//! - `component` — ComponentInstance, ReconciliationState, ReconcilePhase
//! - `stage` — GenerationStage
//! - `errors` — EngineError
//! - `sources` — ThreadSource / ScopeStore traits, SourceError

pub mod component;
pub mod errors;
pub mod message;
pub mod sources;
pub mod stage;
pub mod thread;

pub use component::{ComponentInstance, ReconcilePhase, ReconciliationState};
pub use errors::EngineError;
pub use message::{ActionType, Message, MessageContent, MessageRole, Segment, ToolCallRequest, ToolParameter};
pub use sources::{ScopeStore, SourceError, ThreadSource};
pub use stage::GenerationStage;
pub use thread::{Thread, ThreadListEntry};
