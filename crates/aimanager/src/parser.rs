use serde_json::Value;

use crate::models::tool::FunctionCall;

/// What a raw model response turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Text { content: String },
    FunctionCall(FunctionCall),
}

/// Classifies a raw model response.
///
/// Only a JSON object with a string `function` field and a `parameters` field is a function
/// call. Anything else, including text that is not JSON at all, is returned unchanged as text.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let text = || ParsedResponse::Text {
        content: raw.to_string(),
    };

    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(raw) else {
        return text();
    };
    let name = match object.get("function") {
        Some(Value::String(name)) => name.clone(),
        _ => return text(),
    };
    match object.remove("parameters") {
        Some(parameters) => ParsedResponse::FunctionCall(FunctionCall::new(name, parameters)),
        None => text(),
    }
}
