use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::base::{ConversationKey, ConversationStore};
use crate::errors::StoreError;
use crate::models::message::Message;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_key TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages (conversation_key, id);
";

/// Stores every conversation in one SQLite database.
///
/// Access is serialized through a single connection and runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA)?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Runs `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.blocking_lock();
            let conn = guard.as_mut().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append(&self, key: &ConversationKey, messages: &[Message]) -> Result<(), StoreError> {
        let key = key.storage_key();
        let messages = messages.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO messages (conversation_key, role, content) VALUES (?1, ?2, ?3)",
                )?;
                for message in &messages {
                    stmt.execute(params![key, message.role.to_string(), message.content])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        let key = key.storage_key();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM messages WHERE conversation_key = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content) = row?;
                let role = role
                    .parse()
                    .map_err(|_| StoreError::Corrupt(format!("unknown role `{}`", role)))?;
                messages.push(Message::new(role, content));
            }
            Ok(messages)
        })
        .await
    }

    async fn delete(&self, key: &ConversationKey) -> Result<bool, StoreError> {
        let key = key.storage_key();
        self.with_conn(move |conn| {
            let removed =
                conn.execute("DELETE FROM messages WHERE conversation_key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            tokio::task::spawn_blocking(move || conn.close().map_err(|(_, e)| StoreError::from(e)))
                .await
                .map_err(|e| StoreError::Task(e.to_string()))??;
        }
        Ok(())
    }
}
