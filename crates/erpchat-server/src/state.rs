use std::sync::Arc;

use erpchat::{
    access::AccessChecker,
    credentials::{CredentialStore, EnvironmentStore, StaticStore, API_KEY_FIELD, SETTINGS_SCOPE},
    data::{frappe::FrappeClient, DataSource},
    orchestrator::Assistant,
    providers::factory::{OpenAiProviderFactory, ProviderFactory},
    tools::erpnext::erpnext_catalog,
};

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub access: Arc<AccessChecker>,
    pub auth_token: Arc<str>,
}

impl AppState {
    /// Wire the assistant from explicit collaborators
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        providers: Arc<dyn ProviderFactory>,
        source: Arc<dyn DataSource>,
        auth_token: &str,
    ) -> anyhow::Result<Self> {
        let catalog = Arc::new(erpnext_catalog(source)?);
        Ok(Self {
            assistant: Arc::new(Assistant::new(
                Arc::clone(&credentials),
                Arc::clone(&providers),
                catalog,
            )),
            access: Arc::new(AccessChecker::new(credentials, providers)),
            auth_token: Arc::from(auth_token),
        })
    }

    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let credentials: Arc<dyn CredentialStore> = match settings.credentials.api_key {
            Some(key) => Arc::new(StaticStore::new().with_value(SETTINGS_SCOPE, API_KEY_FIELD, &key)),
            None => Arc::new(EnvironmentStore::openai_default()),
        };
        let providers = Arc::new(OpenAiProviderFactory::new(settings.provider.into_template()));
        let source = Arc::new(FrappeClient::new(settings.data.into_config())?);

        Self::new(credentials, providers, source, &settings.server.auth_token)
    }
}
