//! Implementations of the opaque persistence side channel.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loom_base::ScopeStore;

/// In-memory store for tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryScopeStore {
    values: HashMap<String, String>,
}

impl ScopeStore for MemoryScopeStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSelection {
    thread_id: String,
    saved_at: DateTime<Utc>,
}

/// File-backed store: one YAML file per key under a store directory.
/// Read or parse failures degrade to `None`; writes are best-effort.
#[derive(Debug)]
pub struct FileScopeStore {
    dir: PathBuf,
}

impl FileScopeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys contain scope separators (e.g. "thread:default"); keep the
        // file name flat.
        let name: String = key.chars().map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' }).collect();
        self.dir.join(format!("{}.yaml", name))
    }
}

impl ScopeStore for FileScopeStore {
    fn get(&self, key: &str) -> Option<String> {
        let yaml = fs::read_to_string(self.path_for(key)).ok()?;
        let selection: PersistedSelection = serde_yaml::from_str(&yaml).ok()?;
        Some(selection.thread_id)
    }

    fn set(&mut self, key: &str, value: &str) {
        fs::create_dir_all(&self.dir).ok();
        let selection = PersistedSelection { thread_id: value.to_string(), saved_at: Utc::now() };
        if let Ok(yaml) = serde_yaml::to_string(&selection) {
            fs::write(self.path_for(key), yaml).ok();
        }
    }
}
