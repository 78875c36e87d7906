use async_trait::async_trait;
use std::fmt;

use crate::errors::StoreError;
use crate::models::message::Message;

/// Address of one stored message history
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub agent_id: String,
    pub user_id: String,
    pub conversation_id: Option<String>,
}

impl ConversationKey {
    pub fn new(agent_id: &str, user_id: &str, conversation_id: Option<&str>) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            user_id: user_id.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        }
    }

    /// Flat key used by the backends.
    ///
    /// Components are percent-encoded, so `:` only ever appears as a separator and keys with
    /// and without a conversation id cannot collide.
    pub fn storage_key(&self) -> String {
        let agent = urlencoding::encode(&self.agent_id);
        let user = urlencoding::encode(&self.user_id);
        match &self.conversation_id {
            Some(conversation) => format!(
                "{}:{}:{}:conversation",
                agent,
                user,
                urlencoding::encode(conversation)
            ),
            None => format!("{}:{}:conversation", agent, user),
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Append-only storage of message histories
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append `messages` at the tail of the history, in order
    async fn append(&self, key: &ConversationKey, messages: &[Message]) -> Result<(), StoreError>;

    /// The full history, empty when nothing was stored
    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError>;

    /// Remove the history. Returns whether anything was removed.
    async fn delete(&self, key: &ConversationKey) -> Result<bool, StoreError>;

    /// Release connections held by the store
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key() {
        assert_eq!(
            ConversationKey::new("base", "42", Some("c1")).storage_key(),
            "base:42:c1:conversation"
        );
        assert_eq!(
            ConversationKey::new("base", "42", None).storage_key(),
            "base:42:conversation"
        );
        assert_eq!(
            ConversationKey::new("my agent", "a:b", None).storage_key(),
            "my%20agent:a%3Ab:conversation"
        );
    }

    #[test]
    fn test_storage_keys_do_not_alias() {
        let with_conversation = ConversationKey::new("base", "1", Some("conversation"));
        let escaped_user = ConversationKey::new("base", "1:conversation", None);
        assert_ne!(with_conversation.storage_key(), escaped_user.storage_key());
    }
}
