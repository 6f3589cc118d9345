use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref VALID_FUNCTION_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role,
            "content": message.content,
        });

        if !message.tool_calls.is_empty() {
            converted["tool_calls"] = json!(message.tool_calls);
        }
        if let Some(id) = &message.tool_call_id {
            converted["tool_call_id"] = json!(id);
        }
        if let Some(name) = &message.name {
            converted["name"] = json!(name);
        }

        messages_spec.push(converted);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// An error the provider attached to the returned message itself
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EmbeddedError(pub String);

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;

    if let Some(error) = original.get("error").filter(|e| !e.is_null()) {
        return Err(EmbeddedError(error_text(error)).into());
    }

    let mut message = Message::assistant();
    if let Some(text) = original.get("content").and_then(|c| c.as_str()) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default();
            let function_name = tool_call["function"]["name"].as_str().unwrap_or_default();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            // Kept as requested so the call id still pairs with a result slot; the
            // catalog lookup rejects the name when the tool is dispatched.
            if !is_valid_function_name(function_name) {
                warn!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    function_name
                );
            }
            message = message.with_tool_call(ToolCall::new(id, function_name, arguments));
        }
    }

    Ok(message)
}

/// Extract model ids from a `GET /v1/models` response
pub fn openai_models_from_response(response: &Value) -> Result<Vec<String>> {
    let data = response
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("No model list in response"))?;

    Ok(data
        .iter()
        .filter_map(|model| model.get("id").and_then(|id| id.as_str()))
        .map(String::from)
        .collect())
}

/// Render an OpenAI error object (or bare value) as readable text
pub fn error_text(error: &Value) -> String {
    match error {
        Value::String(text) => text.clone(),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| other.to_string()),
    }
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_FUNCTION_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use serde_json::json;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "role": "assistant",
            "message": {
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "get_open_invoices",
                        "arguments": "{\"customer\": \"Acme\"}"
                    }
                }]
            }
        }],
        "usage": {
            "input_tokens": 10,
            "output_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    #[test]
    fn test_messages_to_openai_spec() {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_openai_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
    }

    #[test]
    fn test_messages_to_openai_spec_tool_exchange() {
        let messages = vec![
            Message::system().with_text("Be brief."),
            Message::assistant()
                .with_text("Let me check.")
                .with_tool_call(ToolCall::new("call_9", "get_customers", "{}")),
            Message::tool_result("call_9", "get_customers", "[]"),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 3);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[1]["tool_calls"][0]["id"], "call_9");
        assert_eq!(spec[1]["tool_calls"][0]["type"], "function");
        assert_eq!(spec[2]["role"], "tool");
        assert_eq!(spec[2]["tool_call_id"], spec[1]["tool_calls"][0]["id"]);
        assert_eq!(spec[2]["name"], "get_customers");
    }

    #[test]
    fn test_tools_to_openai_spec() -> Result<()> {
        let tool = Tool::new(
            "get_customers",
            "List customers",
            json!({"type": "object", "properties": {}}),
        );

        let spec = tools_to_openai_spec(&[tool])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "get_customers");
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let tool = Tool::new("get_customers", "List customers", json!({"type": "object"}));

        let result = tools_to_openai_spec(&[tool.clone(), tool]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_openai_response_to_message_text() -> Result<()> {
        let response = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Your total is 12,500."}
            }]
        });

        let message = openai_response_to_message(&response)?;
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text(), "Your total is 12,500.");
        assert!(!message.has_tool_calls());
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_valid_toolrequest() -> Result<()> {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        let message = openai_response_to_message(&response)?;

        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "1");
        assert_eq!(message.tool_calls[0].name(), "get_open_invoices");
        assert_eq!(message.tool_calls[0].arguments(), r#"{"customer": "Acme"}"#);
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_keeps_invalid_name() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["name"] =
            json!("invalid fn");

        let message = openai_response_to_message(&response)?;
        assert_eq!(message.tool_calls[0].name(), "invalid fn");
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_embedded_error() {
        let response = json!({
            "choices": [{
                "message": {"role": "assistant", "error": {"message": "content filtered"}}
            }]
        });

        let err = openai_response_to_message(&response).unwrap_err();
        assert!(err.downcast_ref::<EmbeddedError>().is_some());
        assert_eq!(err.to_string(), "content filtered");
    }

    #[test]
    fn test_openai_response_without_choices() {
        assert!(openai_response_to_message(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_openai_models_from_response() -> Result<()> {
        let response = json!({"object": "list", "data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}]});
        assert_eq!(
            openai_models_from_response(&response)?,
            vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]
        );
        Ok(())
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("get-open_invoices"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name(""));
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });

        let result = check_openai_context_length_error(&error);
        assert_eq!(
            result.unwrap().to_string(),
            "Context length exceeded. Message: This message is too long"
        );

        let error = json!({"code": "other_error", "message": "Some other error"});
        assert!(check_openai_context_length_error(&error).is_none());
    }

    #[test]
    fn test_error_text() {
        assert_eq!(error_text(&json!("plain")), "plain");
        assert_eq!(
            error_text(&json!({"message": "Incorrect API key provided", "code": "invalid_api_key"})),
            "Incorrect API key provided"
        );
    }
}
