//! REST client for the data engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{PlugsmithError, Result};

use super::{EngineClient, EntityDescriptor};

const ENGINE_USER_AGENT: &str = concat!("plugsmith/", env!("CARGO_PKG_VERSION"));

/// Default collection holding entity descriptors on the engine.
pub const DEFAULT_ENTITIES_COLLECTION: &str = "entities";

/// Engine client over HTTP.
///
/// - `POST {url}/api/collections/{collection}/records` creates a record
/// - `GET {url}/api/collections/{entities}/records/{id}` fetches a descriptor,
///   where `{entities}` is the base-entities collection
pub struct HttpEngineClient {
    base_url: String,
    token: Option<String>,
    entities_collection: String,
    client: Client,
}

impl HttpEngineClient {
    /// Build a client from engine settings.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(ENGINE_USER_AGENT);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            entities_collection: DEFAULT_ENTITIES_COLLECTION.to_string(),
            client: builder.build()?,
        })
    }

    /// Look descriptors up in `collection` instead of `entities`.
    pub fn with_entities_collection(mut self, collection: impl Into<String>) -> Self {
        self.entities_collection = collection.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_record(&self, collection: &str, payload: Value) -> Result<Value> {
        let request = self
            .client
            .post(self.records_url(collection))
            .header("Accept", "application/json")
            .json(&payload);

        let response = self.authorize(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            let detail = detail.trim();
            return Err(PlugsmithError::Install(if detail.is_empty() {
                format!("Engine rejected record for '{}': {}", collection, status)
            } else {
                format!(
                    "Engine rejected record for '{}': {} ({})",
                    collection, status, detail
                )
            }));
        }

        debug!(collection, status = %response.status(), "Record created");

        // Some engines answer 201/204 with an empty body
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn find_entity_descriptor_by_id(&self, id: &str) -> Result<Option<EntityDescriptor>> {
        let url = format!("{}/{}", self.records_url(&self.entities_collection), id);
        let request = self.client.get(url).header("Accept", "application/json");

        let response = self.authorize(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PlugsmithError::Install(format!(
                "Entity lookup for '{}' failed: {}",
                id,
                response.status()
            )));
        }

        Ok(Some(response.json().await?))
    }
}
