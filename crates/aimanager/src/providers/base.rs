use async_trait::async_trait;
use futures::stream::BoxStream;

use super::errors::LlmError;
use crate::models::message::Message;

/// Incremental text fragments of one streamed completion. Single pass: a second read of the
/// same completion needs a new call.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

/// A language-model backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Model used when a call does not name one
    fn default_model(&self) -> &str;

    /// Generate the complete text of the top response choice
    async fn complete(&self, messages: &[Message], model: Option<&str>) -> Result<String, LlmError>;

    /// Generate the response as a stream of text fragments
    async fn stream(&self, messages: &[Message], model: Option<&str>)
        -> Result<TextStream, LlmError>;
}
