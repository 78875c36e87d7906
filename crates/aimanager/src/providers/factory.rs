use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;

use super::{base::Provider, configs::ProviderConfig, openai::OpenAiProvider};
use crate::errors::ConfigError;

/// Backends an agent can be pointed at, by logical name
#[derive(EnumIter, EnumString, Display, AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderType {
    OpenAi,
    LmStudio,
    OpenRouter,
    Custom,
}

/// Used when no provider is named
pub const DEFAULT_PROVIDER: ProviderType = ProviderType::OpenAi;

impl ProviderType {
    /// Resolves a logical name, falling back to [`DEFAULT_PROVIDER`] when none is given
    pub fn resolve(name: Option<&str>) -> Result<Self, ConfigError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(DEFAULT_PROVIDER),
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::UnknownProvider(name.to_string())),
        }
    }

    /// Connection defaults of the backend. Keys that vary per deployment are left unset.
    pub fn default_config(&self) -> ProviderConfig {
        match self {
            ProviderType::OpenAi => ProviderConfig::new("https://api.openai.com", "gpt-4o-mini"),
            ProviderType::LmStudio => ProviderConfig::new("http://localhost", "gpt-4o-mini")
                .with_port(5000)
                .with_api_key("lm-studio"),
            ProviderType::OpenRouter => {
                ProviderConfig::new("https://openrouter.ai/api", "google/gemini-2.0-flash-exp:free")
                    .with_header("HTTP-Referer", "aimanager")
                    .with_header("X-Title", "aimanager")
            }
            ProviderType::Custom => {
                ProviderConfig::new("http://localhost", "gpt-4o-mini").with_port(5000)
            }
        }
    }
}

pub fn get_provider(
    provider_type: ProviderType,
    config: ProviderConfig,
) -> Result<Arc<dyn Provider>, ConfigError> {
    info!(provider = %provider_type, base_url = %config.base_url(), model = %config.model, "creating provider");
    match provider_type {
        ProviderType::OpenAi
        | ProviderType::LmStudio
        | ProviderType::OpenRouter
        | ProviderType::Custom => Ok(Arc::new(OpenAiProvider::new(config)?)),
    }
}
