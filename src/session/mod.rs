//! Append-only conversation history keyed by session id.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::RociError;
use crate::types::{ContentPart, ModelMessage, Role};

/// Storage for session histories.
///
/// Messages are never edited or removed once appended. Appends against one
/// key are serialized; different keys proceed independently.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, key: &str, messages: &[ModelMessage]) -> Result<(), RociError>;

    /// Messages oldest-first. With a limit, only the most recent `limit`.
    async fn read(&self, key: &str, limit: Option<usize>) -> Result<Vec<ModelMessage>, RociError>;
}

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub role: Role,
    pub content: Vec<ContentPart>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl From<&ModelMessage> for SessionRecord {
    fn from(message: &ModelMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp.unwrap_or_else(Utc::now),
            call_id: message.call_id().map(str::to_string),
            agent: message.name.clone(),
        }
    }
}

impl From<SessionRecord> for ModelMessage {
    fn from(record: SessionRecord) -> Self {
        Self {
            role: record.role,
            content: record.content,
            name: record.agent,
            timestamp: Some(record.timestamp),
        }
    }
}

/// A session id bound to a store.
#[derive(Clone)]
pub struct Session {
    id: String,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(id: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            id: id.into(),
            store,
        }
    }

    /// Session backed by a fresh in-memory store.
    pub fn in_memory(id: impl Into<String>) -> Self {
        Self::new(id, Arc::new(InMemorySessionStore::new()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ModelMessage>, RociError> {
        self.store.read(&self.id, limit).await
    }

    pub async fn add_items(&self, messages: &[ModelMessage]) -> Result<(), RociError> {
        self.store.append(&self.id, messages).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Lazily created per-key values, e.g. one lock per session.
pub(crate) struct KeyedSlots<T> {
    slots: Mutex<HashMap<String, Arc<Mutex<T>>>>,
}

impl<T: Default> KeyedSlots<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn slot(&self, key: &str) -> Arc<Mutex<T>> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    pub(crate) async fn existing(&self, key: &str) -> Option<Arc<Mutex<T>>> {
        self.slots.lock().await.get(key).cloned()
    }

    /// Hand back a slot from [`slot`](Self::slot); it is dropped from the map
    /// when no other caller holds it.
    pub(crate) async fn release(&self, key: &str, slot: Arc<Mutex<T>>) {
        let mut slots = self.slots.lock().await;
        // the map and `slot` are the only references
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

/// The last `limit` items of `items`, or all of them.
pub(crate) fn tail<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        let skip = items.len().saturating_sub(limit);
        items.drain(..skip);
    }
    items
}
