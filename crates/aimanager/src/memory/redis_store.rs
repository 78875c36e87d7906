use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::base::{ConversationKey, ConversationStore};
use crate::errors::StoreError;
use crate::models::message::Message;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

/// Keeps each conversation in a Redis list, one JSON message per element.
pub struct RedisStore {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisStore {
    /// Connects to the server at `url`
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            conn: Arc::new(RwLock::new(Some(manager))),
        })
    }

    // The manager multiplexes one connection, so each call works on its own handle.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.conn.read().await.clone().ok_or(StoreError::Closed)
    }
}

#[async_trait]
impl ConversationStore for RedisStore {
    async fn append(&self, key: &ConversationKey, messages: &[Message]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }
        let payloads = messages
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        let mut conn = self.connection().await?;
        conn.rpush::<_, _, ()>(key.storage_key(), payloads).await?;
        Ok(())
    }

    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        let mut conn = self.connection().await?;
        let items: Vec<String> = conn.lrange(key.storage_key(), 0, -1).await?;
        items
            .iter()
            .map(|item| serde_json::from_str(item).map_err(StoreError::from))
            .collect()
    }

    async fn delete(&self, key: &ConversationKey) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(key.storage_key()).await?;
        Ok(removed > 0)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.conn.write().await.take();
        Ok(())
    }
}
