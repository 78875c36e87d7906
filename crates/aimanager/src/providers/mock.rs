use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::base::{Provider, TextStream};
use super::errors::LlmError;
use crate::models::message::Message;

/// A mock provider that replays pre-configured responses and records what it was sent
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    failing: bool,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Into::into).collect())),
            ..Default::default()
        }
    }

    /// A provider whose every call fails with a non-transient error
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    /// Message lists received so far, one per call
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.failing {
            return Err(LlmError::client_error(400, "mock failure".to_string()));
        }
        // Empty response once the script runs out
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn default_model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message], _model: Option<&str>) -> Result<String, LlmError> {
        self.next_response(messages)
    }

    async fn stream(
        &self,
        messages: &[Message],
        _model: Option<&str>,
    ) -> Result<TextStream, LlmError> {
        let response = self.next_response(messages)?;
        // Three-character fragments
        let chars: Vec<char> = response.chars().collect();
        let fragments: Vec<Result<String, LlmError>> = chars
            .chunks(3)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }
}
