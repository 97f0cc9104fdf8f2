//! Dependency-ordered record installation
//!
//! The installer walks a validated [`PluginWrapper`] and sends every record to
//! the engine:
//!
//! 1. the base-entities node (entity definitions), if present and non-empty
//! 2. every other node, each after all of its dependencies
//! 3. one metadata record describing the plugin itself
//!
//! Failures are isolated per file and per record. A file that cannot be read
//! or a record the engine rejects is logged and recorded in the
//! [`InstallReport`], and installation carries on with the next one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::InstallConfig;
use crate::engine::EngineClient;
use crate::error::{PlugsmithError, Result};

use super::reader::ContentReader;
use super::types::{PluginConfig, PluginManifest, PluginWrapper};
use super::variables::placeholders;

/// Path shown in logs and reports for the synthetic metadata record.
pub const METADATA_PATH_MARKER: &str = "<plugin-metadata>";

/// One file or record that failed to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFailure {
    pub path: PathBuf,
    pub target: String,
    /// Position within an array payload, if the file held one.
    pub index: Option<usize>,
    pub reason: String,
}

impl fmt::Display for InstallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(
                f,
                "{} [{}] -> {}: {}",
                self.path.display(),
                index,
                self.target,
                self.reason
            ),
            None => write!(
                f,
                "{} -> {}: {}",
                self.path.display(),
                self.target,
                self.reason
            ),
        }
    }
}

/// Outcome of one install run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Records the engine accepted, including the metadata record.
    pub inserted: usize,
    /// Array elements skipped because they were not objects.
    pub skipped: usize,
    pub failures: Vec<InstallFailure>,
    /// Targets in the order their nodes were processed.
    pub installed_targets: Vec<String>,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Installed {} record(s) across {} target(s), {} skipped, {} failed",
            self.inserted,
            self.installed_targets.len(),
            self.skipped,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

/// Installs the content of a parsed plugin into an engine.
pub struct Installer {
    client: Arc<dyn EngineClient>,
    reader: Arc<dyn ContentReader>,
    settings: InstallConfig,
    /// Target name to "is plugin-scoped", filled on first lookup.
    scoped_cache: HashMap<String, bool>,
}

impl Installer {
    pub fn new(
        client: Arc<dyn EngineClient>,
        reader: Arc<dyn ContentReader>,
        settings: InstallConfig,
    ) -> Self {
        Self {
            client,
            reader,
            settings,
            scoped_cache: HashMap::new(),
        }
    }

    /// Read and resolve every content file, failing on the first
    /// [`PlugsmithError::Resolution`].
    ///
    /// Other read errors are left for [`Installer::install`] to report per
    /// file. Nothing is sent to the engine.
    pub async fn preflight(&self, wrapper: &PluginWrapper) -> Result<()> {
        for node in wrapper.content_map.values() {
            for path in &node.files {
                match self.reader.read(path, &wrapper.config, &node.manifest).await {
                    Err(e @ PlugsmithError::Resolution { .. }) => {
                        error!(path = %path.display(), error = %e, "Unresolved placeholder");
                        return Err(e);
                    }
                    Ok(_) | Err(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Install every node of `wrapper`, then its metadata record.
    ///
    /// The dependency graph must already have been checked; this never
    /// fails as a whole.
    pub async fn install(&mut self, wrapper: &mut PluginWrapper) -> InstallReport {
        let mut report = InstallReport::default();
        info!(
            plugin = %wrapper.config.id,
            version = %wrapper.config.version,
            engine = self.client.name(),
            nodes = wrapper.content_map.len(),
            "Installing plugin"
        );

        let base = self.settings.base_entities_target.clone();
        if wrapper.get(&base).map(|node| !node.is_empty()).unwrap_or(false) {
            self.install_node(wrapper, &base, &mut report).await;
        }

        for target in install_order(wrapper) {
            self.install_node(wrapper, &target, &mut report).await;
        }

        self.install_metadata(&wrapper.config, &mut report).await;

        if report.is_success() {
            info!(plugin = %wrapper.config.id, inserted = report.inserted, "Plugin installed");
        } else {
            warn!(
                plugin = %wrapper.config.id,
                inserted = report.inserted,
                failed = report.failures.len(),
                "Plugin installed with failures"
            );
        }

        report
    }

    async fn install_node(
        &mut self,
        wrapper: &mut PluginWrapper,
        target: &str,
        report: &mut InstallReport,
    ) {
        let Some(node) = wrapper.content_map.get(target) else {
            return;
        };
        if node.is_installed() {
            return;
        }

        info!(collection = %target, files = node.files.len(), "Installing content node");
        for path in &node.files {
            self.install_file(&wrapper.config, &node.manifest, path, report)
                .await;
        }

        if let Some(node) = wrapper.get_mut(target) {
            node.mark_installed();
        }
        report.installed_targets.push(target.to_string());
    }

    async fn install_file(
        &mut self,
        config: &PluginConfig,
        manifest: &PluginManifest,
        path: &Path,
        report: &mut InstallReport,
    ) {
        let target = manifest.target.as_str();

        let payload = match self.reader.read(path, config, manifest).await {
            Ok(payload) => payload,
            Err(e) => {
                record_failure(report, path, target, None, &e);
                return;
            }
        };

        let leftover = placeholders(&payload);
        if !leftover.is_empty() {
            warn!(
                path = %path.display(),
                collection = %target,
                keys = ?leftover,
                "Unresolved placeholders left in content"
            );
        }

        match payload {
            Value::Array(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    if item.is_object() {
                        self.insert(config, target, item, path, Some(index), report)
                            .await;
                    } else {
                        warn!(
                            path = %path.display(),
                            collection = %target,
                            index,
                            kind = json_kind(&item),
                            "Skipping non-object array element"
                        );
                        report.skipped += 1;
                    }
                }
            }
            Value::Object(_) => {
                self.insert(config, target, payload, path, None, report)
                    .await;
            }
            other => {
                let e = PlugsmithError::Install(format!(
                    "content must be an object or an array of objects, found {}",
                    json_kind(&other)
                ));
                record_failure(report, path, target, None, &e);
            }
        }
    }

    async fn insert(
        &mut self,
        config: &PluginConfig,
        target: &str,
        mut payload: Value,
        path: &Path,
        index: Option<usize>,
        report: &mut InstallReport,
    ) {
        if self.is_plugin_scoped(target).await {
            if let Value::Object(map) = &mut payload {
                map.insert(
                    self.settings.plugin_ref_field.clone(),
                    Value::String(config.id.clone()),
                );
            }
        }

        match self.client.create_record(target, payload).await {
            Ok(_) => {
                debug!(path = %path.display(), collection = %target, index = ?index, "Record created");
                report.inserted += 1;
            }
            Err(e) => record_failure(report, path, target, index, &e),
        }
    }

    async fn install_metadata(&mut self, config: &PluginConfig, report: &mut InstallReport) {
        let record = json!({
            "id": config.id,
            "name": config.name,
            "version": config.version,
            "author": config.author,
            "license": config.license,
            "installed_at": Utc::now().to_rfc3339(),
        });
        let target = self.settings.plugins_target.clone();

        self.insert(
            config,
            &target,
            record,
            Path::new(METADATA_PATH_MARKER),
            None,
            report,
        )
        .await;
    }

    /// Whether records for `target` need a back-reference to the plugin.
    ///
    /// Each target is looked up at most once. Lookup failures count as
    /// "not scoped".
    async fn is_plugin_scoped(&mut self, target: &str) -> bool {
        if target == self.settings.plugins_target {
            return false;
        }
        if let Some(scoped) = self.scoped_cache.get(target) {
            return *scoped;
        }

        let scoped = match self.client.find_entity_descriptor_by_id(target).await {
            Ok(Some(descriptor)) => descriptor.plugin_scoped,
            Ok(None) => {
                debug!(collection = %target, "No entity descriptor");
                false
            }
            Err(e) => {
                debug!(collection = %target, error = %e, "Entity descriptor lookup failed");
                false
            }
        };

        self.scoped_cache.insert(target.to_string(), scoped);
        scoped
    }
}

/// Order in which the remaining nodes install: each node after its
/// dependencies, nodes already installed left out.
pub fn install_order(wrapper: &PluginWrapper) -> Vec<String> {
    fn visit<'a>(
        target: &'a str,
        wrapper: &'a PluginWrapper,
        seen: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        if !seen.insert(target) {
            return;
        }
        let Some(node) = wrapper.get(target) else {
            return;
        };
        for dep in wrapper.dependencies_of(target) {
            visit(dep.target(), wrapper, seen, order);
        }
        if !node.is_installed() {
            order.push(target.to_string());
        }
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for target in wrapper.content_map.keys() {
        visit(target, wrapper, &mut seen, &mut order);
    }
    order
}

/// Human-readable reason for a failed read or insertion.
pub fn failure_reason(err: &PlugsmithError) -> String {
    if err.is_connectivity() {
        format!("server unreachable: the data engine could not be contacted ({})", err)
    } else {
        err.to_string()
    }
}

fn record_failure(
    report: &mut InstallReport,
    path: &Path,
    target: &str,
    index: Option<usize>,
    err: &PlugsmithError,
) {
    let reason = failure_reason(err);
    error!(
        path = %path.display(),
        collection = %target,
        index = ?index,
        reason = %reason,
        "Install failed"
    );
    report.failures.push(InstallFailure {
        path: path.to_path_buf(),
        target: target.to_string(),
        index,
        reason,
    });
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
