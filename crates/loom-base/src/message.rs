use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::ComponentInstance;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
}

/// What a message does in the conversation, beyond carrying text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    #[default]
    Normal,
    ToolCall,
    ToolResponse,
}

/// One part of a mixed-content message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    Image { url: String },
}

/// Message content: either a plain string or an ordered list of
/// text/image segments. Streaming deltas always append text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<Segment>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    /// Append a streamed text delta. Content only ever grows.
    pub fn append_delta(&mut self, delta: &str) {
        match self {
            MessageContent::Text(s) => s.push_str(delta),
            MessageContent::Segments(segments) => match segments.last_mut() {
                Some(Segment::Text { text }) => text.push_str(delta),
                _ => segments.push(Segment::Text { text: delta.to_string() }),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(s) => s.is_empty(),
            MessageContent::Segments(segments) => segments.iter().all(|seg| match seg {
                Segment::Text { text } => text.is_empty(),
                Segment::Image { .. } => false,
            }),
        }
    }

    /// Concatenated text of all text segments (images skipped).
    pub fn plain_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Segments(segments) => {
                let mut out = String::new();
                for seg in segments {
                    if let Segment::Text { text } = seg {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }
}

/// A single named argument of a tool invocation. Order matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ToolParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub action_type: ActionType,
    #[serde(default)]
    pub content: MessageContent,
    /// Tool invocation carried by a `ToolCall` message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_request: Option<ToolCallRequest>,
    /// Interactive panel attached to an assistant message. Lifetime equals
    /// the lifetime of the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInstance>,
    /// Set when the user cancelled generation mid-stream. Partial content
    /// is kept.
    #[serde(default)]
    pub is_cancelled: bool,
    /// Inline generation failure for this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new_user(id: String, content: String) -> Self {
        Self {
            id,
            role: MessageRole::User,
            action_type: ActionType::Normal,
            content: MessageContent::Text(content),
            tool_call_request: None,
            component: None,
            is_cancelled: false,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Create an empty assistant message ready for streaming.
    pub fn new_assistant(id: String) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            action_type: ActionType::Normal,
            content: MessageContent::Text(String::new()),
            tool_call_request: None,
            component: None,
            is_cancelled: false,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// Test helpers for building Message instances with sensible defaults.
/// Not gated behind `#[cfg(test)]` so downstream crates can use them.
pub mod test_helpers {
    use super::*;

    /// Builder for constructing test messages with sensible defaults.
    /// Auto-increments IDs per role prefix (U1, A1, T1, R1).
    pub struct MessageBuilder {
        msg: Message,
    }

    impl MessageBuilder {
        fn base(id: String, role: MessageRole, action_type: ActionType) -> Self {
            Self {
                msg: Message {
                    id,
                    role,
                    action_type,
                    content: MessageContent::default(),
                    tool_call_request: None,
                    component: None,
                    is_cancelled: false,
                    error: None,
                    created_at: Utc::now(),
                },
            }
        }

        fn next(prefix: &str) -> String {
            use std::sync::atomic::{AtomicUsize, Ordering};
            static COUNTER: AtomicUsize = AtomicUsize::new(1);
            format!("{}{}", prefix, COUNTER.fetch_add(1, Ordering::Relaxed))
        }

        pub fn user(content: &str) -> Self {
            let mut b = Self::base(Self::next("U"), MessageRole::User, ActionType::Normal);
            b.msg.content = MessageContent::Text(content.to_string());
            b
        }

        pub fn assistant(content: &str) -> Self {
            let mut b = Self::base(Self::next("A"), MessageRole::Assistant, ActionType::Normal);
            b.msg.content = MessageContent::Text(content.to_string());
            b
        }

        pub fn tool_call(tool_name: &str, parameters: Vec<ToolParameter>) -> Self {
            let mut b = Self::base(Self::next("T"), MessageRole::Assistant, ActionType::ToolCall);
            b.msg.tool_call_request = Some(ToolCallRequest { tool_name: tool_name.to_string(), parameters });
            b
        }

        pub fn tool_response(content: &str) -> Self {
            let mut b = Self::base(Self::next("R"), MessageRole::Assistant, ActionType::ToolResponse);
            b.msg.content = MessageContent::Text(content.to_string());
            b
        }

        pub fn id(mut self, id: &str) -> Self {
            self.msg.id = id.to_string();
            self
        }

        pub fn component(mut self, component: ComponentInstance) -> Self {
            self.msg.component = Some(component);
            self
        }

        pub fn segments(mut self, segments: Vec<Segment>) -> Self {
            self.msg.content = MessageContent::Segments(segments);
            self
        }

        pub fn build(self) -> Message {
            self.msg
        }
    }
}
