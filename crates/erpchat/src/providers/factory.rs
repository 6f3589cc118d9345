use anyhow::Result;

use super::base::Provider;
use super::configs::OpenAiProviderConfig;
use super::openai::OpenAiProvider;

/// Builds a provider for a given API key. The key is resolved per request, so the
/// orchestrator asks for a fresh provider each time instead of holding one.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Result<Box<dyn Provider>>;
}

pub struct OpenAiProviderFactory {
    template: OpenAiProviderConfig,
}

impl OpenAiProviderFactory {
    /// `template` supplies everything except the key
    pub fn new(template: OpenAiProviderConfig) -> Self {
        Self { template }
    }
}

impl ProviderFactory for OpenAiProviderFactory {
    fn create(&self, api_key: &str) -> Result<Box<dyn Provider>> {
        let config = OpenAiProviderConfig {
            api_key: api_key.to_string(),
            ..self.template.clone()
        };
        Ok(Box::new(OpenAiProvider::new(config)?))
    }
}
