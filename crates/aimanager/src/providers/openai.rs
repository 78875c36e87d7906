use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::base::{Provider, TextStream};
use super::configs::ProviderConfig;
use super::errors::{classify_http_status, LlmError};
use super::utils::{create_request, response_text, sse_text_stream};
use crate::errors::ConfigError;
use crate::models::message::Message;

/// Client for any endpoint speaking the OpenAI chat-completions protocol
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidSetting(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    async fn post(&self, payload: &Value) -> Result<Response, LlmError> {
        let mut request = self.client.post(self.url()).json(payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        Err(classify_http_status(status.as_u16(), body, retry_after))
    }

    /// Sends the request, retrying transient failures with backoff
    async fn post_with_retry(&self, payload: &Value) -> Result<Response, LlmError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.post(payload).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!("Request succeeded after {} retries", attempt);
                    }
                    return Ok(response);
                }
                Err(error) if retry.should_retry(&error, attempt) => {
                    let delay = retry.delay(&error, attempt);
                    warn!(
                        "Attempt {} failed with {}, retrying in {:?}: {}",
                        attempt + 1,
                        error.kind,
                        delay,
                        error.message
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message], model: Option<&str>) -> Result<String, LlmError> {
        let model = model.unwrap_or(&self.config.model);
        debug!(model, messages = messages.len(), "requesting completion");

        let payload = create_request(messages, model, false);
        let response: Value = self.post_with_retry(&payload).await?.json().await?;
        response_text(&response)
    }

    async fn stream(
        &self,
        messages: &[Message],
        model: Option<&str>,
    ) -> Result<TextStream, LlmError> {
        let model = model.unwrap_or(&self.config.model);
        debug!(model, messages = messages.len(), "requesting streamed completion");

        let payload = create_request(messages, model, true);
        let response = self.post_with_retry(&payload).await?;
        Ok(sse_text_stream(response.bytes_stream()))
    }
}
