use std::path::PathBuf;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;

use super::base::ConversationStore;
use super::file::JsonlStore;
use super::in_memory::InMemoryStore;
use super::redis_store::{RedisStore, DEFAULT_REDIS_URL};
use super::sqlite::SqliteStore;
use crate::errors::{AgentResult, ConfigError};

/// Conversation store backends, by logical name
#[derive(EnumIter, EnumString, Display, AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreType {
    Memory,
    File,
    Sqlite,
    Redis,
}

/// Used when no store is named
pub const DEFAULT_STORE: StoreType = StoreType::Memory;

impl StoreType {
    /// Resolves a logical name, falling back to [`DEFAULT_STORE`] when none is given
    pub fn resolve(name: Option<&str>) -> Result<Self, ConfigError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(DEFAULT_STORE),
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::UnknownStore(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreConfig {
    /// Directory for `file`, database file for `sqlite`, unused otherwise
    pub path: Option<PathBuf>,
    /// Server URL for `redis`, defaulting to [`DEFAULT_REDIS_URL`]
    pub url: Option<String>,
}

impl StoreConfig {
    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            url: None,
        }
    }

    pub fn with_url<S: Into<String>>(url: S) -> Self {
        Self {
            path: None,
            url: Some(url.into()),
        }
    }

    fn require_path(&self, store_type: StoreType) -> Result<PathBuf, ConfigError> {
        self.path
            .clone()
            .ok_or_else(|| ConfigError::MissingSetting(format!("path for the {} store", store_type)))
    }
}

pub async fn get_store(
    store_type: StoreType,
    config: StoreConfig,
) -> AgentResult<Arc<dyn ConversationStore>> {
    info!(store = %store_type, path = ?config.path, url = ?config.url, "opening conversation store");
    match store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreType::File => Ok(Arc::new(JsonlStore::new(config.require_path(store_type)?))),
        StoreType::Sqlite => Ok(Arc::new(
            SqliteStore::open(config.require_path(store_type)?).await?,
        )),
        StoreType::Redis => {
            let url = config.url.as_deref().unwrap_or(DEFAULT_REDIS_URL);
            Ok(Arc::new(RedisStore::connect(url).await?))
        }
    }
}
