use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// How the model may use the advertised tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
}

/// Base trait for chat completion providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for the conversation
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<ToolChoice>,
    ) -> Result<(Message, Usage)>;

    /// List the model ids available to the configured key. Used as a liveness check.
    async fn list_models(&self) -> Result<Vec<String>>;
}
