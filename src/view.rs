//! Read-only view-models for the presentation layer.
//!
//! Pure projections of engine state: no mutation, no timers. Rendering a
//! panel is a function of `{committed, changed_fields, phase}` only.

use std::collections::BTreeSet;

use serde_json::Value;

use loom_base::{
    ActionType, GenerationStage, Message, MessageRole, ReconcilePhase, ScopeStore, ThreadListEntry, ThreadSource,
};

use crate::diff::is_empty_value;
use crate::engine::Engine;
use crate::pairing::{find_response_for, tool_status_label};
use crate::state::EngineState;

/// How one panel field should render.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldView {
    /// Absent or empty in the committed props — render a placeholder.
    Skeleton,
    Value { value: Value, highlighted: bool },
}

/// Reconciled panel state for one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub kind: String,
    pub committed: Value,
    pub changed_fields: BTreeSet<String>,
    pub phase: ReconcilePhase,
}

impl PanelView {
    pub fn field(&self, name: &str) -> FieldView {
        let value = self.committed.get(name).cloned().unwrap_or(Value::Null);
        if is_empty_value(&value) {
            return FieldView::Skeleton;
        }
        FieldView::Value { value, highlighted: self.changed_fields.contains(name) }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ReconcilePhase::Loading
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallView {
    pub tool_name: String,
    pub parameters: Vec<(String, Value)>,
    pub status_label: String,
    /// Paired response content, once it has arrived.
    pub response_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    /// True for the trailing assistant message while a response is in
    /// flight and no content has arrived yet (bouncing-dots slot).
    pub is_loading: bool,
    pub is_cancelled: bool,
    pub error: Option<String>,
    pub tool_call: Option<ToolCallView>,
    pub panel: Option<PanelView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadView {
    pub thread_id: String,
    pub stage: GenerationStage,
    pub stage_label: &'static str,
    pub busy: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub entries: Vec<ThreadListEntry>,
    pub current_id: Option<String>,
    /// Retryable transport failure from the last fetch, if any; the entries
    /// are then last-known-good.
    pub last_error: Option<String>,
}

fn message_view(message: &Message, messages: &[Message], is_last: bool, busy: bool) -> MessageView {
    let tool_call = (message.action_type == ActionType::ToolCall).then(|| {
        // A missing message id cannot occur here: the message came from
        // this same slice.
        let response = find_response_for(message, messages).ok().flatten();
        let in_flight = response.is_none();
        ToolCallView {
            tool_name: message
                .tool_call_request
                .as_ref()
                .map(|req| req.tool_name.clone())
                .unwrap_or_else(|| "tool".to_string()),
            parameters: message
                .tool_call_request
                .as_ref()
                .map(|req| req.parameters.iter().map(|p| (p.name.clone(), p.value.clone())).collect())
                .unwrap_or_default(),
            status_label: tool_status_label(message, in_flight).unwrap_or_default(),
            response_text: response.map(|r| r.content.plain_text()),
        }
    });

    let panel = message.component.as_ref().map(|instance| PanelView {
        kind: instance.kind.clone(),
        committed: instance.reconciliation.committed.clone(),
        changed_fields: instance.reconciliation.changed_fields.clone(),
        phase: instance.reconciliation.phase,
    });

    MessageView {
        id: message.id.clone(),
        role: message.role,
        text: message.content.plain_text(),
        is_loading: is_last && busy && message.role == MessageRole::Assistant && message.content.is_empty(),
        is_cancelled: message.is_cancelled,
        error: message.error.clone(),
        tool_call,
        panel,
    }
}

/// Project the current thread. Tool-response messages never appear; they
/// surface only through their paired call's `response_text`.
pub fn thread_view(state: &EngineState) -> Option<ThreadView> {
    let thread = state.current()?;
    let busy = state.stage.is_busy();
    let last_id = thread.messages.last().map(|m| m.id.clone());
    let messages = thread
        .messages
        .iter()
        .filter(|m| m.action_type != ActionType::ToolResponse)
        .map(|m| message_view(m, &thread.messages, Some(&m.id) == last_id.as_ref(), busy))
        .collect();
    Some(ThreadView {
        thread_id: thread.id.clone(),
        stage: state.stage,
        stage_label: state.stage.label(),
        busy,
        messages,
    })
}

impl<S: ThreadSource, K: ScopeStore> Engine<S, K> {
    pub fn thread_view(&self) -> Option<ThreadView> {
        thread_view(&self.state)
    }

    pub fn history_view(&self) -> HistoryView {
        HistoryView {
            entries: self.history.cached_entries().to_vec(),
            current_id: self.state.current_id.clone(),
            last_error: self.history.last_error().map(|e| e.to_string()),
        }
    }
}
