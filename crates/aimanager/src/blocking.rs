//! A blocking front end for [`crate::agent::Agent`].
//!
//! Each call runs to completion on the calling thread, driven by a private
//! current-thread runtime. Do not use these types from inside an async runtime; use the
//! async agent there instead.

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::runtime::{Builder, Runtime};

use crate::agent::Agent as AsyncAgent;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;

pub struct Agent {
    inner: AsyncAgent,
    runtime: Runtime,
}

impl Agent {
    pub fn new(inner: AsyncAgent) -> AgentResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AgentError::Internal(format!("failed to start runtime: {}", e)))?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &AsyncAgent {
        &self.inner
    }

    pub fn generate_response(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<String> {
        self.runtime
            .block_on(self.inner.generate_response(prompt, user_id, conversation_id))
    }

    /// Streams the reply as an iterator of text fragments
    pub fn generate_response_stream(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<Fragments<'_>> {
        let stream = self.runtime.block_on(self.inner.generate_response_stream(
            prompt,
            user_id,
            conversation_id,
        ))?;
        Ok(Fragments {
            runtime: &self.runtime,
            stream,
        })
    }

    pub fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        include_system: bool,
    ) -> AgentResult<Vec<Message>> {
        self.runtime.block_on(
            self.inner
                .get_conversation(user_id, conversation_id, include_system),
        )
    }

    pub fn clear_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<bool> {
        self.runtime
            .block_on(self.inner.clear_conversation(user_id, conversation_id))
    }

    pub fn close(&self) -> AgentResult<()> {
        self.runtime.block_on(self.inner.close())
    }
}

/// Text fragments of a streamed reply. Dropping it early abandons the turn.
pub struct Fragments<'a> {
    runtime: &'a Runtime,
    stream: BoxStream<'a, AgentResult<String>>,
}

impl Iterator for Fragments<'_> {
    type Item = AgentResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next())
    }
}
