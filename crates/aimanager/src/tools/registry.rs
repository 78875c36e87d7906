use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use super::function::ToolFunction;
use super::schema::derive_schema;
use crate::errors::ConfigError;
use crate::models::tool::Tool;

/// A registered tool: the callable, its advertised schema and the arguments the
/// application injects on every call.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub function: ToolFunction,
    pub schema: Tool,
    pub defaults: Map<String, Value>,
}

/// Tools available to one agent, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, function: ToolFunction) -> Result<(), ConfigError> {
        self.register_described(function, None, Map::new())
    }

    pub fn register_with_defaults(
        &mut self,
        function: ToolFunction,
        defaults: Map<String, Value>,
    ) -> Result<(), ConfigError> {
        self.register_described(function, None, defaults)
    }

    /// Registers `function`, deriving its schema with an optional description override.
    pub fn register_described(
        &mut self,
        function: ToolFunction,
        description: Option<&str>,
        defaults: Map<String, Value>,
    ) -> Result<(), ConfigError> {
        if self.index.contains_key(function.name()) {
            return Err(ConfigError::DuplicateTool(function.name().to_string()));
        }
        let schema = derive_schema(&function, description, &defaults)?;
        debug!(tool = %schema.name, deferred = function.is_deferred(), "registered tool");

        self.index.insert(schema.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            function,
            schema,
            defaults,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn schemas(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.schema.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
