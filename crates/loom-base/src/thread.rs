use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// One conversation: an ordered message list plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Monotonic change counter. Bumped on every mutation (append, content
    /// delta, snapshot commit, cancel) so downstream consumers can detect
    /// "something changed" without deep equality checks.
    #[serde(default)]
    pub revision: u64,
}

impl Thread {
    pub fn new(id: String) -> Self {
        Self { id, label: None, created_at: Utc::now(), messages: Vec::new(), revision: 0 }
    }

    pub fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn entry(&self) -> ThreadListEntry {
        ThreadListEntry { id: self.id.clone(), label: self.label.clone(), created_at: self.created_at }
    }
}

/// Projection of a thread for history lists; carries no messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadListEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ThreadListEntry {
    /// Label for display, falling back to a truncated id
    /// ("Thread 1a2b3c4d") for unlabeled threads.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => {
                let short: String = self.id.chars().take(8).collect();
                format!("Thread {}", short)
            }
        }
    }
}
