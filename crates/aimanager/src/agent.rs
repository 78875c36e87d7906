use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::errors::{AgentError, AgentResult, ConfigError};
use crate::memory::{get_store, ConversationKey, ConversationStore, StoreConfig, StoreType};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{FunctionCall, Tool};
use crate::parser::{parse_response, ParsedResponse};
use crate::prompt_template;
use crate::providers::base::Provider;
use crate::providers::configs::ProviderConfig;
use crate::providers::factory::{get_provider, ProviderType};
use crate::tools::{invoke, result_text, ToolFunction, ToolRegistry};

pub const DEFAULT_AGENT_NAME: &str = "base";
pub const DEFAULT_MAX_TOOL_DEPTH: usize = 5;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant. The assistant is helpful, creative, clever, and very friendly. \
You help users with their tasks and answer their questions. \
The assistant is very good at understanding context and subtext. \
The assistant is very good at understanding natural language.";

/// Per-agent settings
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Part of every conversation key, so agents never share histories
    pub name: String,
    /// Logical provider name, see [`ProviderType`]
    pub provider: Option<String>,
    /// Logical store name, see [`StoreType`]
    pub memory: Option<String>,
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub system_prompt: String,
    /// Tool calls allowed in a single turn
    pub max_tool_depth: usize,
    /// Also store the developer messages produced by tool calls
    pub persist_tool_messages: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            provider: None,
            memory: None,
            model: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_depth: DEFAULT_MAX_TOOL_DEPTH,
            persist_tool_messages: false,
        }
    }
}

impl AgentConfig {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One async mutex per conversation key. Entries nobody holds or waits on are pruned.
#[derive(Default)]
struct ConversationLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationLocks {
    async fn acquire(&self, key: &ConversationKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.storage_key()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Decides which streamed fragments reach the caller.
///
/// Text is forwarded as it arrives unless its first non-whitespace character opens a JSON
/// object, in which case everything is held back until the response can be classified.
#[derive(Default)]
struct FragmentGate {
    text: String,
    forwarded: usize,
    holding: Option<bool>,
}

impl FragmentGate {
    fn push(&mut self, fragment: &str) -> Option<String> {
        self.text.push_str(fragment);
        if self.holding.is_none() {
            self.holding = self.text.trim_start().chars().next().map(|c| c == '{');
        }
        match self.holding {
            Some(false) => self.take_rest(),
            _ => None,
        }
    }

    /// Whatever has not been forwarded yet
    fn take_rest(&mut self) -> Option<String> {
        let rest = &self.text[self.forwarded..];
        if rest.is_empty() {
            return None;
        }
        let rest = rest.to_string();
        self.forwarded = self.text.len();
        Some(rest)
    }
}

/// Agent integrates a language model with conversation memory and the tools it may call
pub struct Agent {
    config: AgentConfig,
    provider: Arc<dyn Provider>,
    store: Arc<dyn ConversationStore>,
    tools: Arc<ToolRegistry>,
    locks: ConversationLocks,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn Provider>,
        store: Arc<dyn ConversationStore>,
    ) -> AgentResult<Self> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("agent name".to_string()).into());
        }
        Ok(Self {
            config,
            provider,
            store,
            tools: Arc::new(ToolRegistry::new()),
            locks: ConversationLocks::default(),
        })
    }

    /// Builds the provider and store named in `config`.
    ///
    /// Without an explicit `provider_config` the preset of the named provider is used.
    pub async fn from_config(
        config: AgentConfig,
        provider_config: Option<ProviderConfig>,
        store_config: StoreConfig,
    ) -> AgentResult<Self> {
        let provider_type = ProviderType::resolve(config.provider.as_deref())?;
        let store_type = StoreType::resolve(config.memory.as_deref())?;

        let provider_config = provider_config.unwrap_or_else(|| provider_type.default_config());
        let provider = get_provider(provider_type, provider_config)?;
        let store = get_store(store_type, store_config).await?;
        Agent::new(config, provider, store)
    }

    /// Replaces the tool registry
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    /// Registers a tool. `defaults` are injected on every call and hidden from the model.
    pub fn register_tool(
        &mut self,
        function: ToolFunction,
        defaults: Map<String, Value>,
    ) -> Result<(), ConfigError> {
        Arc::make_mut(&mut self.tools).register_with_defaults(function, defaults)
    }

    /// Like [`Agent::register_tool`], advertising `description` instead of the tool's own docs
    pub fn register_described(
        &mut self,
        function: ToolFunction,
        description: &str,
        defaults: Map<String, Value>,
    ) -> Result<(), ConfigError> {
        Arc::make_mut(&mut self.tools).register_described(function, Some(description), defaults)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Schemas of the registered tools, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.schemas()
    }

    fn key(&self, user_id: &str, conversation_id: Option<&str>) -> ConversationKey {
        ConversationKey::new(&self.config.name, user_id, conversation_id)
    }

    fn system_prompt(&self) -> AgentResult<String> {
        prompt_template::system_prompt(&self.config.system_prompt, &self.tools.schemas())
            .map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Composes the outbound context and records the user's message.
    ///
    /// The message is stored before any completion is requested, so a failed turn still
    /// leaves the prompt in history. A new conversation also stores the system message.
    async fn begin_turn(&self, key: &ConversationKey, prompt: &str) -> AgentResult<Vec<Message>> {
        let system = Message::system(self.system_prompt()?);
        let user = Message::user(prompt);
        let history = self.store.read(key).await?;
        debug!(conversation = %key, history = history.len(), "starting turn");

        if history.is_empty() {
            self.store.append(key, &[system.clone(), user.clone()]).await?;
        } else {
            self.store.append(key, &[user.clone()]).await?;
        }

        let mut context = Vec::with_capacity(history.len() + 2);
        context.push(system);
        context.extend(history.into_iter().filter(|m| !m.is_system()));
        context.push(user);
        Ok(context)
    }

    /// Runs one requested tool and reports the outcome as a developer message.
    ///
    /// Failures inside the tool are reported to the model rather than returned. An unknown
    /// tool and an exhausted depth budget end the turn.
    async fn run_tool(&self, call: &FunctionCall, depth: &mut usize) -> AgentResult<Message> {
        *depth += 1;
        if *depth > self.config.max_tool_depth {
            return Err(AgentError::ToolDepthExceeded(self.config.max_tool_depth));
        }

        let content = match invoke(call, &self.tools).await {
            Ok(value) => format!("Function `{}` returned: {}", call.name, result_text(&value)),
            Err(AgentError::ToolNotFound(name)) => return Err(AgentError::ToolNotFound(name)),
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool call failed");
                format!("Function `{}` failed: {}", call.name, err)
            }
        };
        Ok(Message::developer(content))
    }

    async fn finish_turn(
        &self,
        key: &ConversationKey,
        tool_messages: Vec<Message>,
        content: &str,
    ) -> AgentResult<()> {
        let mut messages = if self.config.persist_tool_messages {
            tool_messages
        } else {
            Vec::new()
        };
        messages.push(Message::assistant(content));
        self.store.append(key, &messages).await?;
        Ok(())
    }

    /// Runs a full turn and returns the assistant's final text
    pub async fn generate_response(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<String> {
        let key = self.key(user_id, conversation_id);
        let _guard = self.locks.acquire(&key).await;
        let mut context = self.begin_turn(&key, prompt).await?;
        let model = self.config.model.as_deref();

        let mut depth = 0;
        let mut tool_messages = Vec::new();
        loop {
            let raw = self.provider.complete(&context, model).await?;
            match parse_response(&raw) {
                ParsedResponse::Text { content } => {
                    self.finish_turn(&key, tool_messages, &content).await?;
                    return Ok(content);
                }
                ParsedResponse::FunctionCall(call) => {
                    debug!(tool = %call.name, depth, "model requested a tool");
                    let message = self.run_tool(&call, &mut depth).await?;
                    context.push(message.clone());
                    tool_messages.push(message);
                }
            }
        }
    }

    /// Runs a full turn, streaming the assistant's text as it is produced.
    ///
    /// Responses that turn out to be function calls are never shown; the tool runs and a new
    /// completion is streamed instead. The conversation stays locked until the stream is
    /// finished or dropped.
    pub async fn generate_response_stream(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<BoxStream<'_, AgentResult<String>>> {
        let key = self.key(user_id, conversation_id);
        let guard = self.locks.acquire(&key).await;
        let context = self.begin_turn(&key, prompt).await?;

        Ok(Box::pin(async_stream::try_stream! {
            let _guard = guard;
            let mut context = context;
            let model = self.config.model.as_deref();
            let mut depth = 0;
            let mut tool_messages = Vec::new();

            loop {
                let mut fragments = self
                    .provider
                    .stream(&context, model)
                    .await
                    .map_err(AgentError::from)?;
                let mut gate = FragmentGate::default();
                while let Some(fragment) = fragments.next().await {
                    let fragment = fragment.map_err(AgentError::from)?;
                    if let Some(visible) = gate.push(&fragment) {
                        yield visible;
                    }
                }

                match parse_response(&gate.text) {
                    ParsedResponse::FunctionCall(call) => {
                        debug!(tool = %call.name, depth, "model requested a tool");
                        let message = self.run_tool(&call, &mut depth).await?;
                        context.push(message.clone());
                        tool_messages.push(message);
                    }
                    ParsedResponse::Text { content } => {
                        if let Some(rest) = gate.take_rest() {
                            yield rest;
                        }
                        self.finish_turn(&key, tool_messages, &content).await?;
                        break;
                    }
                }
            }
        }))
    }

    /// Stored history of a conversation.
    ///
    /// Developer messages are never returned; system messages only on request.
    pub async fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        include_system: bool,
    ) -> AgentResult<Vec<Message>> {
        let history = self.store.read(&self.key(user_id, conversation_id)).await?;
        Ok(history
            .into_iter()
            .filter(|m| match m.role {
                Role::Developer => false,
                Role::System => include_system,
                Role::User | Role::Assistant => true,
            })
            .collect())
    }

    /// Deletes a conversation. Returns whether there was anything to delete.
    pub async fn clear_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<bool> {
        let key = self.key(user_id, conversation_id);
        let _guard = self.locks.acquire(&key).await;
        Ok(self.store.delete(&key).await?)
    }

    /// Releases the store's resources
    pub async fn close(&self) -> AgentResult<()> {
        Ok(self.store.close().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::providers::errors::LlmError;
    use crate::providers::mock::MockProvider;
    use crate::tools::Signature;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use serde_json::json;
    use std::time::Duration;

    const ECHO_CALL: &str = r#"{"function": "echo", "parameters": {"msg": "ping"}}"#;

    fn echo() -> ToolFunction {
        ToolFunction::immediate("echo", Signature::new().arg::<String>("msg"), |args| {
            Ok(json!(args.get::<String>("msg")?))
        })
        .with_doc("Echo the message back")
    }

    fn agent_with(provider: &MockProvider) -> (Agent, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let agent = Agent::new(AgentConfig::default(), Arc::new(provider.clone()), store.clone())
            .unwrap();
        (agent, store)
    }

    async fn stored(store: &InMemoryStore, user: &str, conversation: Option<&str>) -> Vec<Message> {
        store
            .read(&ConversationKey::new(DEFAULT_AGENT_NAME, user, conversation))
            .await
            .unwrap()
    }

    fn developer_messages(messages: &[Message]) -> Vec<&Message> {
        messages.iter().filter(|m| m.role == Role::Developer).collect()
    }

    #[tokio::test]
    async fn test_plain_turn_is_persisted_in_order() -> Result<()> {
        let provider = MockProvider::new(vec!["hi there"]);
        let (agent, store) = agent_with(&provider);

        let reply = agent.generate_response("hello", "42", None).await?;
        assert_eq!(reply, "hi there");
        assert_eq!(
            stored(&store, "42", None).await,
            vec![
                Message::system(DEFAULT_SYSTEM_PROMPT),
                Message::user("hello"),
                Message::assistant("hi there"),
            ]
        );
        assert_eq!(
            provider.requests(),
            vec![vec![Message::system(DEFAULT_SYSTEM_PROMPT), Message::user("hello")]]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_follow_up_turn_sends_history() -> Result<()> {
        let provider = MockProvider::new(vec!["first", "second"]);
        let (agent, store) = agent_with(&provider);

        agent.generate_response("one", "42", Some("c")).await?;
        agent.generate_response("two", "42", Some("c")).await?;

        assert_eq!(
            provider.requests()[1],
            vec![
                Message::system(DEFAULT_SYSTEM_PROMPT),
                Message::user("one"),
                Message::assistant("first"),
                Message::user("two"),
            ]
        );
        let history = stored(&store, "42", Some("c")).await;
        assert_eq!(history.iter().filter(|m| m.is_system()).count(), 1);
        assert_eq!(history.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_loop() -> Result<()> {
        let provider = MockProvider::new(vec![ECHO_CALL, "done"]);
        let (mut agent, store) = agent_with(&provider);
        agent.register_tool(echo(), Map::new())?;

        let reply = agent.generate_response("call echo", "42", None).await?;
        assert_eq!(reply, "done");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0][0].content.contains(r#""name":"echo""#));
        let developer = developer_messages(&requests[1]);
        assert_eq!(developer.len(), 1);
        assert!(developer[0].content.contains("ping"));

        let history = stored(&store, "42", None).await;
        assert!(developer_messages(&history).is_empty());
        assert_eq!(history.last(), Some(&Message::assistant("done")));
        Ok(())
    }

    #[tokio::test]
    async fn test_system_prompt_mentions_tools_only_when_registered() -> Result<()> {
        let provider = MockProvider::new(vec!["a"]);
        let (agent, _) = agent_with(&provider);
        agent.generate_response("hello", "1", None).await?;
        assert_eq!(provider.requests()[0][0].content, DEFAULT_SYSTEM_PROMPT);

        let provider = MockProvider::new(vec!["a"]);
        let (mut agent, _) = agent_with(&provider);
        agent.register_tool(echo(), Map::new())?;
        agent.generate_response("hello", "1", None).await?;
        let system = &provider.requests()[0][0];
        assert!(system.content.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(system.content.contains(r#""function""#));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_failures_are_reported_to_the_model() -> Result<()> {
        let failing = ToolFunction::immediate("explode", Signature::new(), |_| bail!("kaboom"))
            .with_doc("Always fails");
        let provider = MockProvider::new(vec![
            r#"{"function": "explode", "parameters": {}}"#,
            r#"{"function": "echo", "parameters": {"wrong": 1}}"#,
            "sorry about that",
        ]);
        let (mut agent, _) = agent_with(&provider);
        agent.register_tool(failing, Map::new())?;
        agent.register_tool(echo(), Map::new())?;

        let reply = agent.generate_response("try it", "42", None).await?;
        assert_eq!(reply, "sorry about that");

        let requests = provider.requests();
        let developer = developer_messages(&requests[2]);
        assert_eq!(developer.len(), 2);
        assert!(developer[0].content.contains("kaboom"));
        assert!(developer[1].content.contains("wrong"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_ends_the_turn() {
        let provider = MockProvider::new(vec![r#"{"function": "missing", "parameters": {}}"#]);
        let (agent, store) = agent_with(&provider);

        let err = agent.generate_response("hello", "42", None).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "missing"));
        assert_eq!(
            stored(&store, "42", None).await,
            vec![Message::system(DEFAULT_SYSTEM_PROMPT), Message::user("hello")]
        );
    }

    #[tokio::test]
    async fn test_tool_depth_is_capped() {
        let provider = MockProvider::new(vec![ECHO_CALL; 10]);
        let store = Arc::new(InMemoryStore::new());
        let config = AgentConfig {
            max_tool_depth: 2,
            ..Default::default()
        };
        let mut agent = Agent::new(config, Arc::new(provider.clone()), store.clone()).unwrap();
        agent.register_tool(echo(), Map::new()).unwrap();

        let err = agent.generate_response("loop", "42", None).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolDepthExceeded(2)));
        assert_eq!(provider.requests().len(), 3);
        assert!(stored(&store, "42", None)
            .await
            .iter()
            .all(|m| m.role != Role::Assistant));
    }

    #[tokio::test]
    async fn test_user_message_survives_provider_failure() {
        let provider = MockProvider::failing();
        let (agent, store) = agent_with(&provider);

        let err = agent.generate_response("hello", "42", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(
            stored(&store, "42", None).await,
            vec![Message::system(DEFAULT_SYSTEM_PROMPT), Message::user("hello")]
        );
    }

    #[tokio::test]
    async fn test_persisted_tool_messages_stay_hidden() -> Result<()> {
        let provider = MockProvider::new(vec![ECHO_CALL, "done"]);
        let store = Arc::new(InMemoryStore::new());
        let config = AgentConfig {
            persist_tool_messages: true,
            ..Default::default()
        };
        let mut agent = Agent::new(config, Arc::new(provider.clone()), store.clone())?;
        agent.register_tool(echo(), Map::new())?;

        agent.generate_response("call echo", "42", None).await?;
        let history = stored(&store, "42", None).await;
        assert_eq!(developer_messages(&history).len(), 1);

        let visible = agent.get_conversation("42", None, true).await?;
        assert!(developer_messages(&visible).is_empty());
        assert_eq!(visible.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_and_clear_conversation() -> Result<()> {
        let provider = MockProvider::new(vec!["a", "b"]);
        let (agent, _) = agent_with(&provider);
        agent.generate_response("with id", "42", Some("c1")).await?;
        agent.generate_response("without id", "42", None).await?;

        assert_eq!(
            agent.get_conversation("42", Some("c1"), false).await?,
            vec![Message::user("with id"), Message::assistant("a")]
        );
        assert_eq!(agent.get_conversation("42", Some("c1"), true).await?.len(), 3);
        assert!(agent.get_conversation("7", None, true).await?.is_empty());

        assert!(agent.clear_conversation("42", Some("c1")).await?);
        assert!(!agent.clear_conversation("42", Some("c1")).await?);
        assert!(agent.get_conversation("42", Some("c1"), true).await?.is_empty());
        assert_eq!(
            agent.get_conversation("42", None, false).await?,
            vec![Message::user("without id"), Message::assistant("b")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_forwards_text() -> Result<()> {
        let provider = MockProvider::new(vec!["Hello there, friend"]);
        let (agent, store) = agent_with(&provider);

        let fragments: Vec<String> = agent
            .generate_response_stream("hi", "42", None)
            .await?
            .try_collect()
            .await?;
        assert!(fragments.len() > 1);
        assert_eq!(fragments.concat(), "Hello there, friend");
        assert_eq!(
            stored(&store, "42", None).await.last(),
            Some(&Message::assistant("Hello there, friend"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_runs_tools_without_leaking_calls() -> Result<()> {
        let provider = MockProvider::new(vec![ECHO_CALL, "the echo said ping"]);
        let (mut agent, store) = agent_with(&provider);
        agent.register_tool(echo(), Map::new())?;

        let fragments: Vec<String> = agent
            .generate_response_stream("call echo", "42", None)
            .await?
            .try_collect()
            .await?;
        assert_eq!(fragments.concat(), "the echo said ping");
        assert!(fragments.iter().all(|f| !f.contains('{')));

        assert_eq!(developer_messages(&provider.requests()[1]).len(), 1);
        assert_eq!(
            stored(&store, "42", None).await.last(),
            Some(&Message::assistant("the echo said ping"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_releases_held_json_that_is_not_a_call() -> Result<()> {
        let provider = MockProvider::new(vec![r#"  {"answer": 42}"#]);
        let (agent, _) = agent_with(&provider);

        let fragments: Vec<String> = agent
            .generate_response_stream("json please", "42", None)
            .await?
            .try_collect()
            .await?;
        assert_eq!(fragments, vec![r#"  {"answer": 42}"#.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_propagates_unknown_tool() -> Result<()> {
        let provider = MockProvider::new(vec![r#"{"function": "missing", "parameters": {}}"#]);
        let (agent, _) = agent_with(&provider);

        let mut stream = agent.generate_response_stream("hello", "42", None).await?;
        let err = stream.try_next().await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(_)));
        Ok(())
    }

    #[test]
    fn test_fragment_gate() {
        let mut gate = FragmentGate::default();
        assert_eq!(gate.push("  "), None);
        assert_eq!(gate.push("Hi"), Some("  Hi".to_string()));
        assert_eq!(gate.push("!"), Some("!".to_string()));
        assert_eq!(gate.take_rest(), None);

        let mut gate = FragmentGate::default();
        assert_eq!(gate.push("\n{\"fun"), None);
        assert_eq!(gate.push("ction\"}"), None);
        assert_eq!(gate.take_rest(), Some("\n{\"function\"}".to_string()));
    }

    /// Delays every completion so concurrent turns overlap
    struct SlowProvider(MockProvider);

    #[async_trait]
    impl Provider for SlowProvider {
        fn default_model(&self) -> &str {
            self.0.default_model()
        }

        async fn complete(&self, messages: &[Message], model: Option<&str>) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.complete(messages, model).await
        }

        async fn stream(
            &self,
            messages: &[Message],
            model: Option<&str>,
        ) -> Result<crate::providers::base::TextStream, LlmError> {
            self.0.stream(messages, model).await
        }
    }

    #[tokio::test]
    async fn test_turns_on_one_conversation_are_serialized() -> Result<()> {
        let store = Arc::new(InMemoryStore::new());
        let provider = SlowProvider(MockProvider::new(vec!["reply one", "reply two"]));
        let agent = Agent::new(AgentConfig::default(), Arc::new(provider), store.clone())?;

        let (first, second) = tokio::join!(
            agent.generate_response("one", "42", None),
            agent.generate_response("two", "42", None),
        );
        first?;
        second?;

        let history = stored(&store, "42", None).await;
        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_configuration_errors() {
        let err = Agent::new(
            AgentConfig::named(" "),
            Arc::new(MockProvider::default()),
            Arc::new(InMemoryStore::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AgentError::Config(ConfigError::MissingSetting(_))));

        let config = AgentConfig {
            provider: Some("nonexistent".to_string()),
            ..Default::default()
        };
        let err = Agent::from_config(config, None, StoreConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(ConfigError::UnknownProvider(_))));

        let config = AgentConfig {
            memory: Some("mem0".to_string()),
            ..Default::default()
        };
        let err = Agent::from_config(config, None, StoreConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(ConfigError::UnknownStore(_))));
    }

    #[tokio::test]
    async fn test_from_config_uses_presets() -> Result<()> {
        let config = AgentConfig {
            provider: Some("lmstudio".to_string()),
            ..AgentConfig::named("helper")
        };
        let agent = Agent::from_config(config, None, StoreConfig::default()).await?;
        assert_eq!(agent.name(), "helper");
        assert!(agent.tools().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_registration_errors_surface_before_any_turn() {
        let provider = MockProvider::new(vec!["unused"]);
        let (mut agent, _) = agent_with(&provider);
        let bare = ToolFunction::immediate("bare", Signature::new(), |_| Ok(Value::Null));

        assert!(matches!(
            agent.register_tool(bare, Map::new()),
            Err(ConfigError::MissingDescription(_))
        ));
        assert!(provider.requests().is_empty());
    }
}
