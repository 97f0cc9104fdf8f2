//! Content file readers
//!
//! A [`ContentReader`] turns one content path into the JSON payload the
//! installer sends, with every placeholder already substituted. The
//! filesystem reader is the only source today.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PlugsmithError, Result};

use super::types::{PluginConfig, PluginManifest};
use super::variables::resolve;

/// Source of resolved content payloads.
#[async_trait]
pub trait ContentReader: Send + Sync {
    /// Read `path` and resolve it against plugin and manifest variables.
    async fn read(
        &self,
        path: &Path,
        config: &PluginConfig,
        manifest: &PluginManifest,
    ) -> Result<Value>;
}

/// Reads content files from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsContentReader {
    strict: bool,
}

impl FsContentReader {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

#[async_trait]
impl ContentReader for FsContentReader {
    async fn read(
        &self,
        path: &Path,
        config: &PluginConfig,
        manifest: &PluginManifest,
    ) -> Result<Value> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PlugsmithError::Install(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            PlugsmithError::Install(format!("Malformed JSON in {}: {}", path.display(), e))
        })?;

        resolve_layers(&value, config, manifest, self.strict)
    }
}

/// Apply plugin-level variables, then manifest-level ones.
///
/// Strictness is enforced on the last pass only, so a placeholder may be
/// satisfied by either layer.
pub fn resolve_layers(
    value: &Value,
    config: &PluginConfig,
    manifest: &PluginManifest,
    strict: bool,
) -> Result<Value> {
    match &manifest.variables {
        Some(manifest_vars) => {
            let partial = resolve(value, &config.variables, false)?;
            resolve(&partial, manifest_vars, strict)
        }
        None => resolve(value, &config.variables, strict),
    }
}
