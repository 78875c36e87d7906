use serde_json::{Map, Value};
use tracing::debug;

use super::registry::ToolRegistry;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::FunctionCall;

/// Splits model-supplied parameters into positional and keyword arguments.
///
/// An object carrying `args` and/or `kwargs` is taken apart; any other object is used
/// whole as keyword arguments.
fn reconcile(parameters: &Value) -> AgentResult<(Vec<Value>, Map<String, Value>)> {
    match parameters {
        Value::Null => Ok((Vec::new(), Map::new())),
        Value::Object(map) if map.contains_key("args") || map.contains_key("kwargs") => {
            let args = match map.get("args") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.clone(),
                Some(other) => {
                    return Err(AgentError::InvalidParameters(format!(
                        "`args` must be an array, got {}",
                        other
                    )))
                }
            };
            let kwargs = match map.get("kwargs") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(kwargs)) => kwargs.clone(),
                Some(other) => {
                    return Err(AgentError::InvalidParameters(format!(
                        "`kwargs` must be an object, got {}",
                        other
                    )))
                }
            };
            Ok((args, kwargs))
        }
        Value::Object(map) => Ok((Vec::new(), map.clone())),
        other => Err(AgentError::InvalidParameters(format!(
            "parameters must be an object, got {}",
            other
        ))),
    }
}

/// Runs the tool named by `call`.
///
/// An unknown name is a [`AgentError::ToolNotFound`]. Binding problems are
/// [`AgentError::InvalidParameters`] and failures inside the tool are
/// [`AgentError::ExecutionError`].
pub async fn invoke(call: &FunctionCall, registry: &ToolRegistry) -> AgentResult<Value> {
    let tool = registry
        .get(&call.name)
        .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

    let (args, kwargs) = reconcile(&call.parameters)?;
    let bound = tool.function.signature().bind(args, kwargs, &tool.defaults)?;
    debug!(tool = %call.name, "invoking tool");

    tool.function
        .handler()
        .call(bound)
        .await
        .map_err(|e| AgentError::ExecutionError(format!("{:#}", e)))
}

/// Text form of a tool result as fed back to the model
pub fn result_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
