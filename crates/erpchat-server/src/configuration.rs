use crate::error::{to_env_var, ConfigError};
use anyhow::anyhow;
use config::{Config, Environment, File};
use erpchat::data::frappe::FrappeConfig;
use erpchat::providers::configs::{OpenAiProviderConfig, OPENAI_HOST, OPENAI_MODEL};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret the host application presents on every request
    #[serde(default)]
    pub auth_token: String,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_token: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            host: default_openai_host(),
            model: default_model(),
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    /// Template for per-request providers; the key is filled in at request time
    pub fn into_template(self) -> OpenAiProviderConfig {
        let mut config = OpenAiProviderConfig::new("")
            .with_host(self.host)
            .with_model(self.model);
        config.temperature = self.temperature;
        config.max_tokens = self.max_tokens;
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialSettings {
    /// Fixed provider key. When unset the key is read from `OPENAI_API_KEY` per request.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DataSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

impl DataSettings {
    pub fn into_config(self) -> FrappeConfig {
        FrappeConfig {
            host: self.host,
            api_key: self.api_key,
            api_secret: self.api_secret,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub data: DataSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", default_openai_host())?
            .set_default("provider.model", default_model())?
            .set_default("provider.timeout_secs", default_timeout_secs())?
            .add_source(File::with_name("erpchat").required(false))
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("ERPCHAT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match err {
                config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(&field),
                },
                other => ConfigError::Other(other),
            }
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Required values have no sensible default and must be present and non-empty
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("server.auth_token", &self.server.auth_token),
            ("data.host", &self.data.host),
            ("data.api_key", &self.data.api_key),
            ("data.api_secret", &self.data.api_secret),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ConfigError::MissingEnvVar {
                env_var: to_env_var(field),
            }),
            None => Ok(()),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    600
}
