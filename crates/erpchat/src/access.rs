use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::credentials::{resolve_api_key, CredentialStore};
use crate::errors::ChatError;
use crate::providers::factory::ProviderFactory;
use crate::session::SessionContext;

/// Role required to use the assistant
pub const REQUIRED_ROLE: &str = "System Manager";

/// Whether the chat entry point should be offered to the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub show_button: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn permitted() -> Self {
        Self {
            show_button: true,
            reason: None,
        }
    }

    pub fn denied<S: Into<String>>(reason: S) -> Self {
        Self {
            show_button: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validates provider keys and gates access to the assistant
pub struct AccessChecker {
    credentials: Arc<dyn CredentialStore>,
    providers: Arc<dyn ProviderFactory>,
}

impl AccessChecker {
    pub fn new(credentials: Arc<dyn CredentialStore>, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            credentials,
            providers,
        }
    }

    /// True when the provider accepts `api_key`
    pub async fn test_credential(&self, api_key: &str) -> bool {
        match self.ping(api_key).await {
            Ok(()) => true,
            Err(e) => {
                warn!("OpenAI API Key Test Failed: {}", e);
                false
            }
        }
    }

    /// Role first, then a configured key, then a live check of that key
    pub async fn check_access(&self, context: &SessionContext) -> AccessDecision {
        match self.gates(context).await {
            Ok(()) => AccessDecision::permitted(),
            Err(err) => AccessDecision::denied(err.to_string()),
        }
    }

    async fn gates(&self, context: &SessionContext) -> Result<(), ChatError> {
        if !context.has_role(REQUIRED_ROLE) {
            return Err(ChatError::AccessDenied(
                "Only System Managers can access.".to_string(),
            ));
        }

        let api_key = resolve_api_key(self.credentials.as_ref())
            .map_err(|e| ChatError::AccessDenied(e.to_string()))?;

        self.ping(&api_key)
            .await
            .map_err(|e| ChatError::AccessDenied(e.to_string()))
    }

    async fn ping(&self, api_key: &str) -> Result<()> {
        let provider = self.providers.create(api_key)?;
        provider.list_models().await?;
        Ok(())
    }
}
