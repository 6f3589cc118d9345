use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::credentials::{resolve_api_key, CredentialStore};
use crate::errors::{ChatError, ErrorResult, ToolError, ToolResult};
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::providers::base::{Provider, ToolChoice};
use crate::providers::factory::ProviderFactory;
use crate::session::SessionContext;
use crate::tools::catalog::ToolCatalog;
use crate::tools::render_result;

/// Instruction placed at the head of every conversation
pub const PRE_PROMPT: &str = "You are an AI assistant integrated with ERPNext. Please provide accurate and helpful responses based on the following questions and data provided by the user.";

/// What the caller gets back: the assistant's message, or an error payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Message(Message),
    Error(ErrorResult),
}

/// Runs a conversation against the provider, answering tool calls from the catalog
pub struct Assistant {
    credentials: Arc<dyn CredentialStore>,
    providers: Arc<dyn ProviderFactory>,
    catalog: Arc<ToolCatalog>,
}

impl Assistant {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        providers: Arc<dyn ProviderFactory>,
        catalog: Arc<ToolCatalog>,
    ) -> Self {
        Self {
            credentials,
            providers,
            catalog,
        }
    }

    /// Answer the conversation. The pre-prompt is prepended to `conversation` and any
    /// tool exchange is appended to it. Failures come back as [`Reply::Error`].
    pub async fn handle(&self, context: &SessionContext, conversation: &mut Vec<Message>) -> Reply {
        match self.reply(context, conversation).await {
            Ok(message) => Reply::Message(message),
            Err(err) => {
                error!("OpenAI API Error: {}", err);
                Reply::Error(err.into())
            }
        }
    }

    async fn reply(
        &self,
        context: &SessionContext,
        conversation: &mut Vec<Message>,
    ) -> Result<Message, ChatError> {
        let api_key = resolve_api_key(self.credentials.as_ref())?;
        let provider = self
            .providers
            .create(&api_key)
            .map_err(ChatError::provider)?;

        conversation.insert(0, Message::system().with_text(PRE_PROMPT));
        debug!(
            user = %context.user_id,
            "OpenAI Question: {}",
            serde_json::to_string(&*conversation).unwrap_or_default()
        );

        let tools = self.catalog.describe_all();
        let (response, usage) = provider
            .complete(conversation, &tools, Some(ToolChoice::Auto))
            .await
            .map_err(ChatError::provider)?;
        debug!(?usage, "OpenAI Response: {:?}", response);

        if !response.has_tool_calls() {
            return Ok(response);
        }

        conversation.push(response.clone());
        self.dispatch_tool_calls(&response.tool_calls, conversation)
            .await;

        self.second_pass(provider.as_ref(), conversation).await
    }

    async fn second_pass(
        &self,
        provider: &dyn Provider,
        conversation: &[Message],
    ) -> Result<Message, ChatError> {
        let (response, usage) = provider
            .complete(conversation, &[], None)
            .await
            .map_err(ChatError::provider)?;
        debug!(?usage, "OpenAI Response: {:?}", response);
        Ok(response)
    }

    /// Run each call in order, appending a tool message for every result. A failing
    /// call is logged and skipped so the rest still run.
    async fn dispatch_tool_calls(&self, tool_calls: &[ToolCall], conversation: &mut Vec<Message>) {
        for tool_call in tool_calls {
            match self.invoke(tool_call).await {
                Ok(result) => conversation.push(Message::tool_result(
                    &tool_call.id,
                    tool_call.name(),
                    render_result(&result),
                )),
                Err(err) => {
                    let err = ChatError::from(err);
                    warn!(tool = tool_call.name(), "OpenAI Tool Error: {}", err);
                }
            }
        }
    }

    async fn invoke(&self, tool_call: &ToolCall) -> ToolResult<serde_json::Value> {
        let tool = self
            .catalog
            .resolve(tool_call.name())
            .ok_or_else(|| ToolError::ToolNotFound(tool_call.name().to_string()))?;

        tool.call(tool_call.arguments()).await?.ok_or_else(|| {
            ToolError::NoResult(format!(
                "Error calling function: {} with args: {}",
                tool_call.name(),
                tool_call.arguments()
            ))
        })
    }
}
