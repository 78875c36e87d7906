use futures::{Stream, StreamExt};
use serde_json::{json, Value};

use super::base::TextStream;
use super::errors::LlmError;
use crate::models::message::Message;

/// Chat-completions request body
pub fn create_request(messages: &[Message], model: &str, stream: bool) -> Value {
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });
    if stream {
        payload["stream"] = json!(true);
    }
    payload
}

fn api_error(error: &Value) -> LlmError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    match error.get("code").and_then(Value::as_u64) {
        Some(code) => super::errors::classify_http_status(code as u16, message, None),
        None => LlmError::server_error(500, message),
    }
}

/// Text of the top choice of a non-streamed response
pub fn response_text(response: &Value) -> Result<String, LlmError> {
    if let Some(error) = response.get("error") {
        return Err(api_error(error));
    }
    let message = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| LlmError::parse_error(format!("No choices in response: {}", response)))?;

    match message.get("content") {
        Some(Value::String(text)) => Ok(text.clone()),
        None | Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(LlmError::parse_error(format!(
            "Unexpected message content: {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Delta(String),
    Done,
    /// Blank lines, comments, other fields and empty deltas
    Skip,
}

/// Interprets one server-sent-events line of a streamed chat completion
pub fn parse_sse_line(line: &str) -> Result<SseEvent, LlmError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| LlmError::parse_error(format!("Invalid stream chunk {}: {}", data, e)))?;
    if let Some(error) = chunk.get("error") {
        return Err(api_error(error));
    }
    match chunk["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(SseEvent::Delta(text.to_string())),
        _ => Ok(SseEvent::Skip),
    }
}

/// Turns a raw SSE byte stream into text fragments.
///
/// Lines are reassembled across chunk boundaries before decoding so multi-byte characters
/// split between chunks survive.
pub fn sse_text_stream<S, B, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<LlmError> + Send,
{
    Box::pin(async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();
        let mut done = false;

        while !done {
            let Some(chunk) = body.next().await else {
                break;
            };
            let chunk = chunk.map_err(Into::into)?;
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line))? {
                    SseEvent::Delta(text) => yield text,
                    SseEvent::Done => {
                        done = true;
                        break;
                    }
                    SseEvent::Skip => {}
                }
            }
        }

        if !done && !buffer.is_empty() {
            if let SseEvent::Delta(text) = parse_sse_line(&String::from_utf8_lossy(&buffer))? {
                yield text;
            }
        }
    })
}
