//! Data engine clients
//!
//! The installer talks to the engine through the [`EngineClient`] trait:
//! one call to create a record in a collection, and one to look up the
//! entity descriptor for a collection. [`HttpEngineClient`] speaks the
//! engine's REST API; [`DryRunEngineClient`] records calls without sending
//! anything.

mod dry_run;
mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use dry_run::DryRunEngineClient;
pub use http::{HttpEngineClient, DEFAULT_ENTITIES_COLLECTION};

/// Engine-side description of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Records of this entity carry a reference to the plugin that owns them.
    #[serde(default, alias = "pluginScoped")]
    pub plugin_scoped: bool,
}

/// The record-creation surface of a data engine.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Create one record in `collection`, returning the engine's response.
    async fn create_record(&self, collection: &str, payload: Value) -> Result<Value>;

    /// Look up the descriptor of the entity named `id`.
    async fn find_entity_descriptor_by_id(&self, id: &str) -> Result<Option<EntityDescriptor>>;
}
