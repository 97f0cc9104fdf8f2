//! Install pipeline orchestration
//!
//! [`PluginManager`] runs the stages for one request in sequence:
//! discovery, parsing, dependency checking, the strict-mode placeholder
//! preflight and finally installation. Everything before installation fails
//! fast, so an invalid plugin never sends a single record.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::InstallConfig;
use crate::engine::EngineClient;
use crate::error::{PlugsmithError, Result};

use super::dependency::check;
use super::discovery::discover;
use super::installer::{InstallReport, Installer};
use super::parser::parse;
use super::reader::{ContentReader, FsContentReader};
use super::types::PluginWrapper;

/// Runs install requests against one engine.
pub struct PluginManager {
    client: Arc<dyn EngineClient>,
    reader: Arc<dyn ContentReader>,
    settings: InstallConfig,
}

impl PluginManager {
    /// Create a manager reading content from the filesystem.
    pub fn new(client: Arc<dyn EngineClient>, settings: InstallConfig) -> Self {
        let reader = Arc::new(FsContentReader::new(settings.strict));
        Self {
            client,
            reader,
            settings,
        }
    }

    /// Replace the content reader.
    pub fn with_reader(mut self, reader: Arc<dyn ContentReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Discover, parse and dependency-check the plugin at `root`.
    pub fn load(root: &Path) -> Result<PluginWrapper> {
        let paths = discover(root)?;
        let wrapper = parse(&paths)?;
        check(&wrapper.content_map)?;
        Ok(wrapper)
    }

    /// Everything an install does short of contacting the engine.
    pub async fn validate(&self, root: &Path) -> Result<PluginWrapper> {
        let wrapper = Self::load(root)?;
        if self.settings.strict {
            self.installer().preflight(&wrapper).await?;
        }
        info!(
            plugin = %wrapper.config.id,
            nodes = wrapper.content_map.len(),
            files = wrapper.file_count(),
            "Plugin is valid"
        );
        Ok(wrapper)
    }

    /// Install the plugin at `root`.
    ///
    /// Returns an error only for problems found before installation starts.
    /// Per-file failures are reported in the [`InstallReport`].
    pub async fn install(&self, root: &Path) -> Result<InstallReport> {
        let mut wrapper = self.validate(root).await?;
        let mut installer = self.installer();
        Ok(installer.install(&mut wrapper).await)
    }

    /// Removing an installed plugin is not supported.
    pub async fn uninstall(&self, root: &Path) -> Result<()> {
        Err(PlugsmithError::Unimplemented(format!(
            "uninstall is not supported (requested for {})",
            root.display()
        )))
    }

    fn installer(&self) -> Installer {
        Installer::new(
            Arc::clone(&self.client),
            Arc::clone(&self.reader),
            self.settings.clone(),
        )
    }
}
