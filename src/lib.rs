//! Thread synchronization engine for generative chat UIs.
//!
//! Hosts a conversation model (threads, messages, tool calls, interactive
//! panels) and keeps it consistent while an assistant streams: staged
//! generation progress, debounced prop reconciliation with change
//! highlighting, tool call/response pairing, auto-scroll intent, and a
//! thread history manager with last-active persistence.
//!
//! The engine is single-threaded and event-driven: the host loop feeds it
//! [`EventEnvelope`]s via [`Engine::apply`], calls [`Engine::tick`] with a
//! monotonic millisecond clock to fire debounce and highlight deadlines,
//! and renders from the read-only view-models in [`view`].

pub mod config;
pub mod constants;
pub mod diff;
pub mod engine;
pub mod events;
pub mod history;
pub mod pairing;
pub mod persistence;
pub mod reconcile;
pub mod scroll;
pub mod state;
pub mod view;

pub use config::EngineConfig;
pub use engine::Engine;
pub use events::{EventEnvelope, GenerationEvent};
pub use history::ThreadHistory;
pub use persistence::{FileScopeStore, MemoryScopeStore};
pub use scroll::ScrollRequest;
pub use state::EngineState;
pub use view::{FieldView, HistoryView, MessageView, PanelView, ThreadView, ToolCallView};

pub use loom_base;
