use serde::Serialize;
use serde_json::Value;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const FUNCTION_INSTRUCTIONS: &str = include_str!("prompts/function_instructions.md");

#[derive(Serialize)]
struct SystemPromptContext<'a> {
    system_prompt: &'a str,
    instructions: &'a str,
    tools: String,
}

/// The system message content for an agent.
///
/// Without tools this is the configured prompt as is. With tools the prompt is followed by
/// the function-calling instructions and the tool schemas as one JSON array.
pub fn system_prompt(base: &str, tools: &[Tool]) -> Result<String, TeraError> {
    if tools.is_empty() {
        return Ok(base.to_string());
    }
    let specs = Value::Array(tools.iter().map(Tool::to_function_spec).collect());
    let context = SystemPromptContext {
        system_prompt: base.trim(),
        instructions: FUNCTION_INSTRUCTIONS.trim(),
        tools: specs.to_string(),
    };

    let mut tera = Tera::default();
    tera.add_raw_template("system", SYSTEM_TEMPLATE)?;
    let rendered = tera.render("system", &Context::from_serialize(&context)?)?;
    Ok(rendered.trim_end().to_string())
}
