use async_trait::async_trait;

use super::{tail, KeyedSlots, SessionStore};
use crate::error::RociError;
use crate::types::ModelMessage;

/// Process-local session store.
pub struct InMemorySessionStore {
    sessions: KeyedSlots<Vec<ModelMessage>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: KeyedSlots::new(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, key: &str, messages: &[ModelMessage]) -> Result<(), RociError> {
        let slot = self.sessions.slot(key).await;
        slot.lock().await.extend_from_slice(messages);
        Ok(())
    }

    async fn read(&self, key: &str, limit: Option<usize>) -> Result<Vec<ModelMessage>, RociError> {
        let Some(slot) = self.sessions.existing(key).await else {
            return Ok(Vec::new());
        };
        let items = slot.lock().await.clone();
        Ok(tail(items, limit))
    }
}
