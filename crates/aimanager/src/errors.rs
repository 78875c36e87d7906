use thiserror::Error;

use crate::providers::errors::LlmError;

/// Errors surfaced by a conversation turn or by agent setup
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool call depth exceeded: more than {0} tool calls in a single turn")]
    ToolDepthExceeded(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Setup-time faults. These are raised before any turn runs and are never absorbed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown completion provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown conversation store: {0}")]
    UnknownStore(String),

    #[error("Tool `{0}` has neither a description nor documentation")]
    MissingDescription(String),

    #[error("Tool `{0}` is already registered")]
    DuplicateTool(String),

    #[error("Invalid tool name `{0}`: names may only contain letters, digits, '_' and '-'")]
    InvalidToolName(String),

    #[error("Invalid signature for tool `{tool}`: {reason}")]
    InvalidSignature { tool: String, reason: String },

    #[error("Missing setting: {0}")]
    MissingSetting(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored message could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Store has been closed")]
    Closed,

    #[error("Store task failed: {0}")]
    Task(String),
}
