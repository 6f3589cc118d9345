use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, ToolChoice, Usage};
use crate::providers::factory::ProviderFactory;

/// What the mock saw on one `complete` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Default)]
struct MockState {
    responses: Vec<Result<Message, String>>,
    calls: Vec<RecordedCall>,
    model_listings: usize,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
    valid_key: Option<String>,
    api_key: String,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Like `new`, but an `Err` entry makes that call fail with the given text
    pub fn with_results(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                responses,
                ..Default::default()
            })),
            valid_key: None,
            api_key: String::new(),
        }
    }

    /// Only this key passes `list_models`
    pub fn accepting_key(mut self, key: &str) -> Self {
        self.valid_key = Some(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn model_listings(&self) -> usize {
        self.state.lock().unwrap().model_listings
    }

    /// A factory handing out providers that share this mock's state
    pub fn factory(&self) -> Arc<MockProviderFactory> {
        Arc::new(MockProviderFactory {
            provider: self.clone(),
            created: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<ToolChoice>,
    ) -> Result<(Message, Usage)> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            tool_choice,
        });
        if state.responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant().with_text(""), Usage::default()))
        } else {
            match state.responses.remove(0) {
                Ok(message) => Ok((message, Usage::default())),
                Err(text) => Err(anyhow!(text)),
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.state.lock().unwrap().model_listings += 1;
        match &self.valid_key {
            Some(valid) if *valid != self.api_key => Err(anyhow!(
                "Request failed: 401 Unauthorized: Incorrect API key provided: {}.",
                self.api_key
            )),
            _ => Ok(vec!["gpt-4o".to_string()]),
        }
    }
}

pub struct MockProviderFactory {
    provider: MockProvider,
    created: Arc<Mutex<Vec<String>>>,
}

impl MockProviderFactory {
    /// Keys passed to `create`, in order
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(&self, api_key: &str) -> Result<Box<dyn Provider>> {
        self.created.lock().unwrap().push(api_key.to_string());
        let mut provider = self.provider.clone();
        provider.api_key = api_key.to_string();
        Ok(Box::new(provider))
    }
}
