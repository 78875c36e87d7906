use regex::Regex;
use serde_json::{json, Map, Value};

use super::function::ToolFunction;
use super::signature::ParamKind;
use crate::errors::ConfigError;
use crate::models::tool::Tool;

fn is_valid_function_name(name: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9_-]+$")
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Derives the advertised schema of `function`.
///
/// `description` overrides the function's own documentation. Parameters listed in `hidden`
/// are supplied by the application and left out of the schema entirely.
pub fn derive_schema(
    function: &ToolFunction,
    description: Option<&str>,
    hidden: &Map<String, Value>,
) -> Result<Tool, ConfigError> {
    let name = function.name();
    if !is_valid_function_name(name) {
        return Err(ConfigError::InvalidToolName(name.to_string()));
    }
    let description = non_blank(description)
        .or_else(|| non_blank(function.doc()))
        .ok_or_else(|| ConfigError::MissingDescription(name.to_string()))?;
    function
        .signature()
        .validate(hidden)
        .map_err(|reason| ConfigError::InvalidSignature {
            tool: name.to_string(),
            reason,
        })?;

    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut additional_properties = false;

    for param in function.signature().params() {
        match param.kind {
            ParamKind::Named => {
                if hidden.contains_key(&param.name) {
                    continue;
                }
                properties.insert(
                    param.name.clone(),
                    json!({
                        "type": param.ty,
                        "description": format!("{} parameter", param.name),
                    }),
                );
                if param.is_required() {
                    required.push(param.name.clone());
                }
            }
            ParamKind::VarPositional => {
                properties.insert(
                    param.name.clone(),
                    json!({
                        "type": "array",
                        "items": {"type": "string"},
                        "description": format!("{} (positional arguments)", param.name),
                    }),
                );
            }
            ParamKind::VarKeyword => additional_properties = true,
        }
    }

    Ok(Tool::new(
        name,
        description,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": additional_properties,
        }),
        !additional_properties,
    ))
}
