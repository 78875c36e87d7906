use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::base::{ConversationKey, ConversationStore};
use crate::errors::StoreError;
use crate::models::message::Message;

/// Stores each conversation as a JSON-lines file, one message per line.
///
/// File names are the hex SHA-256 of the storage key so any id is safe on disk.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// The directory is created on first write
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &ConversationKey) -> PathBuf {
        let digest = Sha256::digest(key.storage_key().as_bytes());
        self.dir.join(format!("{:x}.jsonl", digest))
    }
}

fn is_not_found(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound
}

#[async_trait]
impl ConversationStore for JsonlStore {
    async fn append(&self, key: &ConversationKey, messages: &[Message]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut lines = Vec::new();
        for message in messages {
            serde_json::to_writer(&mut lines, message)?;
            lines.push(b'\n');
        }

        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(key))
            .await?;
        file.write_all(&lines).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        let contents = match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => contents,
            Err(err) if is_not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut messages = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            messages.push(serde_json::from_str(line)?);
        }
        Ok(messages)
    }

    async fn delete(&self, key: &ConversationKey) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
