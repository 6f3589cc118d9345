use super::role::Role;
use super::tool::ToolCall;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Chat clients echo `"tool_calls": null` on plain assistant turns
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ToolCall>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    fn with_role(role: Role) -> Self {
        Message {
            role,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new system message
    pub fn system() -> Self {
        Self::with_role(Role::System)
    }

    /// Create a new user message
    pub fn user() -> Self {
        Self::with_role(Role::User)
    }

    /// Create a new assistant message
    pub fn assistant() -> Self {
        Self::with_role(Role::Assistant)
    }

    /// Create the result message answering the tool call `id`
    pub fn tool_result<I, N, C>(id: I, name: N, content: C) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        C: Into<String>,
    {
        Message {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// Set the text content of the message
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content = Some(text.into());
        self
    }

    /// Add a tool call to the message
    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_calls.push(tool_call);
        self
    }

    /// The text content, or an empty string
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn has_text(&self) -> bool {
        !self.text().is_empty()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message_from_caller_json() {
        let message: Message =
            serde_json::from_value(json!({"role": "user", "content": "Hi"})).unwrap();
        assert_eq!(message, Message::user().with_text("Hi"));
    }

    #[test]
    fn test_null_tool_calls_from_caller_json() {
        let message: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": "Total is 500.",
            "tool_calls": null
        }))
        .unwrap();
        assert_eq!(message, Message::assistant().with_text("Total is 500."));
    }

    #[test]
    fn test_assistant_tool_call_message_omits_absent_fields() {
        let message = Message::assistant().with_tool_call(ToolCall::new(
            "call_1",
            "get_open_invoices",
            r#"{"customer":"Acme"}"#,
        ));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value.get("content").is_none());
        assert!(value.get("tool_call_id").is_none());
        assert_eq!(value["tool_calls"][0]["function"]["name"], "get_open_invoices");
        assert!(message.has_tool_calls());
        assert!(!message.has_text());
    }

    #[test]
    fn test_tool_result_shape() {
        let message = Message::tool_result("call_1", "get_open_invoices", "12500");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "tool",
                "content": "12500",
                "tool_call_id": "call_1",
                "name": "get_open_invoices"
            })
        );
    }

    #[test]
    fn test_null_content_is_empty_text() {
        let message: Message =
            serde_json::from_value(json!({"role": "assistant", "content": null})).unwrap();
        assert_eq!(message.text(), "");
        assert!(!message.has_text());
    }
}
