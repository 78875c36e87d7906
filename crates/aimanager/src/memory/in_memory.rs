use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::base::{ConversationKey, ConversationStore};
use crate::errors::StoreError;
use crate::models::message::Message;

/// Process-local store, mostly useful for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(&self, key: &ConversationKey, messages: &[Message]) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(key.storage_key())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(&key.storage_key())
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, key: &ConversationKey) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations.remove(&key.storage_key()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::contract;

    #[tokio::test]
    async fn test_append_read_delete() {
        contract::append_read_delete(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        contract::keys_are_isolated(&InMemoryStore::new()).await;
    }
}
