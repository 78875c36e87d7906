//! Durable conversation history.
//!
//! Backends:
//! - `memory`: process-local, lost on exit
//! - `file`: one JSON-lines file per conversation
//! - `sqlite`: a single SQLite database
//! - `redis`: one Redis list per conversation

mod base;
mod factory;
mod file;
mod in_memory;
mod redis_store;
mod sqlite;

pub use base::{ConversationKey, ConversationStore};
pub use factory::{get_store, StoreConfig, StoreType, DEFAULT_STORE};
pub use file::JsonlStore;
pub use in_memory::InMemoryStore;
pub use redis_store::{RedisStore, DEFAULT_REDIS_URL};
pub use sqlite::SqliteStore;
