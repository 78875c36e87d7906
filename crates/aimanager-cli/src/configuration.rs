use crate::error::{to_env_var, ConfigError};
use aimanager::agent::{AgentConfig, DEFAULT_AGENT_NAME, DEFAULT_MAX_TOOL_DEPTH, DEFAULT_SYSTEM_PROMPT};
use aimanager::memory::{StoreConfig, StoreType};
use aimanager::providers::configs::ProviderConfig;
use aimanager::providers::factory::ProviderType;
use config::{Config, Environment};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tool_depth")]
    pub max_tool_depth: usize,
    #[serde(default)]
    pub persist_tool_messages: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            system_prompt: None,
            max_tool_depth: default_max_tool_depth(),
            persist_tool_messages: false,
        }
    }
}

/// Connection settings. Anything left unset falls back to the preset of the named provider.
#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider")]
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider(),
            host: None,
            port: None,
            api_key: None,
            model: None,
            timeout_secs: None,
        }
    }
}

impl ProviderSettings {
    pub fn provider_type(&self) -> Result<ProviderType, ConfigError> {
        Ok(ProviderType::resolve(Some(&self.name))?)
    }

    /// Layers these settings over the provider preset
    pub fn into_config(self) -> Result<(ProviderType, ProviderConfig), ConfigError> {
        let provider_type = self.provider_type()?;
        let mut config = provider_type.default_config();

        if let Some(host) = self.host {
            config.host = host;
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config.api_key = self
            .api_key
            .or_else(|| env::var(api_key_env_var(provider_type)).ok())
            .or(config.api_key);

        Ok((provider_type, config))
    }
}

/// Vendor variable consulted when no key is configured explicitly
pub fn api_key_env_var(provider_type: ProviderType) -> &'static str {
    match provider_type {
        ProviderType::OpenAi => "OPENAI_API_KEY",
        ProviderType::LmStudio => "LM_STUDIO_API_KEY",
        ProviderType::OpenRouter => "OPENROUTER_API_KEY",
        ProviderType::Custom => "CUSTOM_OPENAI_API_KEY",
    }
}

#[derive(Debug, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_memory")]
    pub name: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            name: default_memory(),
            path: None,
            url: None,
        }
    }
}

impl MemorySettings {
    /// Resolves the store, placing file and sqlite data under the user data directory when no
    /// path is set. Redis falls back to `REDIS_URL`.
    pub fn into_config(self) -> Result<(StoreType, StoreConfig), ConfigError> {
        let store_type = StoreType::resolve(Some(&self.name))?;
        let config = match (store_type, self.path) {
            (StoreType::Memory, _) => StoreConfig::default(),
            (StoreType::Redis, _) => StoreConfig {
                path: None,
                url: self.url.or_else(|| env::var(REDIS_URL).ok()),
            },
            (_, Some(path)) => StoreConfig::at(path),
            (StoreType::File, None) => StoreConfig::at(data_dir()?.join("conversations")),
            (StoreType::Sqlite, None) => StoreConfig::at(data_dir()?.join("conversations.db")),
        };
        Ok((store_type, config))
    }
}

const REDIS_URL: &str = "REDIS_URL";

fn data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("aimanager"))
        .ok_or_else(|| ConfigError::NoDataDir {
            env_var: to_env_var("memory.path"),
        })
}

/// Values given on the command line. They win over the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub agent: Option<String>,
    pub provider: Option<String>,
    pub memory: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub memory: MemorySettings,
}

impl Settings {
    pub fn new(overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_and_validate(overrides)
    }

    fn load_and_validate(overrides: &Overrides) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("agent.name", default_agent_name())?
            .set_default("agent.max_tool_depth", default_max_tool_depth() as u64)?
            .set_default("provider.name", default_provider())?
            .set_default("memory.name", default_memory())?
            .add_source(
                Environment::with_prefix("AIMANAGER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("agent.name", overrides.agent.clone())?
            .set_override_option("provider.name", overrides.provider.clone())?
            .set_override_option("provider.model", overrides.model.clone())?
            .set_override_option("memory.name", overrides.memory.clone())?
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                match err {
                    config::ConfigError::Type {
                        key: Some(key),
                        expected,
                        ..
                    } => Err(ConfigError::InvalidEnvVar {
                        env_var: to_env_var(&key),
                        message: format!("expected {}", expected),
                    }),
                    err => Err(ConfigError::Other(err)),
                }
            }
        }
    }

    /// Splits the settings into what [`aimanager::agent::Agent::from_config`] takes
    pub fn into_agent_config(
        self,
    ) -> Result<(AgentConfig, ProviderConfig, StoreConfig), ConfigError> {
        let (provider_type, provider_config) = self.provider.into_config()?;
        let (store_type, store_config) = self.memory.into_config()?;

        let agent_config = AgentConfig {
            name: self.agent.name,
            provider: Some(provider_type.to_string()),
            memory: Some(store_type.to_string()),
            model: None,
            system_prompt: self
                .agent
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tool_depth: self.agent.max_tool_depth,
            persist_tool_messages: self.agent.persist_tool_messages,
        };
        Ok((agent_config, provider_config, store_config))
    }
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

fn default_max_tool_depth() -> usize {
    DEFAULT_MAX_TOOL_DEPTH
}

fn default_provider() -> String {
    "openai".to_string()
}

// The CLI keeps history between invocations
fn default_memory() -> String {
    "file".to_string()
}
