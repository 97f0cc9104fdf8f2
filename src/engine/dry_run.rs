//! Engine client that records calls instead of sending them.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;

use super::{EngineClient, EntityDescriptor};

/// Records every `create_record` call in order and reports no entity as
/// plugin-scoped. Used for `--dry-run` installs.
#[derive(Debug, Default)]
pub struct DryRunEngineClient {
    records: Mutex<Vec<(String, Value)>>,
}

impl DryRunEngineClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded so far, as `(collection, payload)` pairs.
    pub async fn records(&self) -> Vec<(String, Value)> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl EngineClient for DryRunEngineClient {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn create_record(&self, collection: &str, payload: Value) -> Result<Value> {
        info!(collection, payload = %payload, "Dry run: would create record");
        self.records
            .lock()
            .await
            .push((collection.to_string(), payload.clone()));
        Ok(payload)
    }

    async fn find_entity_descriptor_by_id(&self, _id: &str) -> Result<Option<EntityDescriptor>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dry_run_records_in_order() {
        let client = DryRunEngineClient::new();
        client.create_record("roles", json!({"name": "admin"})).await.unwrap();
        client.create_record("users", json!({"login": "root"})).await.unwrap();

        let records = client.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "roles");
        assert_eq!(records[1].1, json!({"login": "root"}));
        assert!(client
            .find_entity_descriptor_by_id("users")
            .await
            .unwrap()
            .is_none());
    }
}
