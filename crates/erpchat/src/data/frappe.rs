use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{DataSource, ListQuery};

#[derive(Debug, Clone)]
pub struct FrappeConfig {
    pub host: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Reads records through the host's `/api/resource` REST endpoints
pub struct FrappeClient {
    client: Client,
    base: Url,
    config: FrappeConfig,
}

impl FrappeClient {
    pub fn new(config: FrappeConfig) -> Result<Self> {
        let base = Url::parse(&config.host)
            .map_err(|e| anyhow!("Invalid data host {}: {}", config.host, e))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("Invalid data host {}", config.host));
        }

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    fn resource_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid data host {}", self.base))?
            .pop_if_empty()
            .extend(["api", "resource"])
            .extend(segments);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("token {}:{}", self.config.api_key, self.config.api_secret)
    }

    async fn fetch(&self, url: Url, query: &[(&str, String)]) -> Result<Option<Value>> {
        let response = self
            .client
            .get(url)
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: Value = response.json().await?;
                Ok(body.get("data").cloned())
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(anyhow!("Request failed: {}", status)),
        }
    }
}

#[async_trait]
impl DataSource for FrappeClient {
    async fn get_list(&self, doctype: &str, query: &ListQuery) -> Result<Vec<Value>> {
        let url = self.resource_url(&[doctype])?;

        let filters: Vec<Value> = query.filters.iter().map(|f| f.to_frappe()).collect();
        let mut params = vec![
            ("filters", serde_json::to_string(&filters)?),
            // 0 asks Frappe for every matching row
            ("limit_page_length", query.limit.unwrap_or(0).to_string()),
        ];
        if !query.fields.is_empty() {
            params.push(("fields", serde_json::to_string(&query.fields)?));
        }

        match self.fetch(url, &params).await? {
            Some(Value::Array(rows)) => Ok(rows),
            Some(other) => Err(anyhow!("Unexpected list payload for {}: {}", doctype, other)),
            None => Err(anyhow!("Unknown doctype {}", doctype)),
        }
    }

    async fn get_doc(&self, doctype: &str, name: &str) -> Result<Option<Value>> {
        let url = self.resource_url(&[doctype, name])?;
        self.fetch(url, &[]).await
    }
}
