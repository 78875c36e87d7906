use std::time::Duration;

use super::errors::RetryConfig;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Connection settings of an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Scheme and host, e.g. `https://api.openai.com`
    pub host: String,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    /// Default model name; a per-call model wins over it
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Sent with every request
    pub headers: Vec<(String, String)>,
}

impl ProviderConfig {
    pub fn new<H: Into<String>, M: Into<String>>(host: H, model: M) -> Self {
        Self {
            host: host.into(),
            port: None,
            api_key: None,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            headers: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `{host}[:{port}]/v1`
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.port {
            Some(port) => format!("{}:{}/v1", host, port),
            None => format!("{}/v1", host),
        }
    }
}
