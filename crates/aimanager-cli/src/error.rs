use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {env_var} has an invalid value: {message}")]
    InvalidEnvVar { env_var: String, message: String },
    #[error("No data directory available; set {env_var}")]
    NoDataDir { env_var: String },
    #[error(transparent)]
    Agent(#[from] aimanager::errors::ConfigError),
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Maps a dotted settings path like `provider.port` to its environment variable
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "AIMANAGER_{}",
        field_path.to_uppercase().replace('.', "__")
    )
}
