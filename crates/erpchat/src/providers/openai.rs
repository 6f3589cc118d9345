use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};

use super::base::{Provider, ToolChoice, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    check_openai_context_length_error, error_text, messages_to_openai_spec,
    openai_models_from_response, openai_response_to_message, tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok());

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok());

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok())
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => input.checked_add(output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.host.trim_end_matches('/'), path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => {
                // The body usually explains the rejection, e.g. an invalid key
                let detail = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body.get("error").map(error_text));
                match detail {
                    Some(detail) => Err(anyhow!("Request failed: {}: {}", status, detail)),
                    None => Err(anyhow!("Request failed: {}", status)),
                }
            }
        }
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let request = self
            .client
            .post(self.url("v1/chat/completions"))
            .json(&payload);
        self.send(request).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<ToolChoice>,
    ) -> Result<(Message, Usage)> {
        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert(
            "messages".to_string(),
            json!(messages_to_openai_spec(messages)),
        );

        // tool_choice is only meaningful alongside tools
        if !tools.is_empty() {
            payload.insert("tools".to_string(), json!(tools_to_openai_spec(tools)?));
            if let Some(choice) = tool_choice {
                payload.insert("tool_choice".to_string(), json!(choice));
            }
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload.insert("max_tokens".to_string(), json!(tokens));
        }

        let response = self.post(Value::Object(payload)).await?;

        // Raise specific error if context length is exceeded
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("OpenAI API error: {}", error_text(error)));
        }

        let message = openai_response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self.send(self.client.get(self.url("v1/models"))).await?;
        openai_models_from_response(&response)
    }
}
