use std::collections::HashMap;
use std::env;

#[cfg(test)]
use mockall::automock;

use crate::errors::ChatError;

/// Settings record holding the provider key
pub const SETTINGS_SCOPE: &str = "OpenAI Settings";
pub const API_KEY_FIELD: &str = "api_key";

/// Read-only access to administrative settings
pub trait CredentialStore: Send + Sync {
    fn get(&self, scope: &str, key_name: &str) -> Option<String>;
}

/// Look up the provider key. An empty value counts as unset.
pub fn resolve_api_key(store: &dyn CredentialStore) -> Result<String, ChatError> {
    store
        .get(SETTINGS_SCOPE, API_KEY_FIELD)
        .filter(|key| !key.trim().is_empty())
        .ok_or(ChatError::MissingCredential)
}

/// Values fixed at startup, e.g. from the configuration file
#[derive(Debug, Default, Clone)]
pub struct StaticStore {
    values: HashMap<(String, String), String>,
}

impl StaticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, scope: &str, key_name: &str, value: &str) -> Self {
        self.values
            .insert((scope.to_string(), key_name.to_string()), value.to_string());
        self
    }
}

impl CredentialStore for StaticStore {
    fn get(&self, scope: &str, key_name: &str) -> Option<String> {
        self.values
            .get(&(scope.to_string(), key_name.to_string()))
            .cloned()
    }
}

#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> Result<String, env::VarError>;
}

// Implement the trait for the actual environment
pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

/// Settings read from environment variables on every lookup
pub struct EnvironmentStore<E: Environment = RealEnvironment> {
    env: E,
    bindings: HashMap<(String, String), String>,
}

impl EnvironmentStore<RealEnvironment> {
    /// Binds the provider key to `OPENAI_API_KEY`
    pub fn openai_default() -> Self {
        EnvironmentStore::new(RealEnvironment).bind(SETTINGS_SCOPE, API_KEY_FIELD, "OPENAI_API_KEY")
    }
}

impl<E: Environment> EnvironmentStore<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            bindings: HashMap::new(),
        }
    }

    /// Serve `scope`/`key_name` from the variable `var`
    pub fn bind(mut self, scope: &str, key_name: &str, var: &str) -> Self {
        self.bindings
            .insert((scope.to_string(), key_name.to_string()), var.to_string());
        self
    }
}

impl<E: Environment> CredentialStore for EnvironmentStore<E> {
    fn get(&self, scope: &str, key_name: &str) -> Option<String> {
        let var = self
            .bindings
            .get(&(scope.to_string(), key_name.to_string()))?;
        match self.env.get_var(var) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Could not read {}: {}", var, e);
                None
            }
        }
    }
}
