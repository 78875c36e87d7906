use serde::{Deserialize, Serialize};

use super::role::Role;

/// A single entry of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    pub fn system<S: Into<String>>(content: S) -> Self {
        Message::new(Role::System, content)
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Message::new(Role::User, content)
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Assistant, content)
    }

    pub fn developer<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Developer, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}
