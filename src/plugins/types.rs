//! Plugin types for Plugsmith
//!
//! This module defines the data model shared by every install stage: the
//! classified paths produced by discovery, the descriptors parsed from
//! `plugin.json` and `manifest.json`, and the content tree the installer walks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the root plugin descriptor.
pub const CONFIG_FILE_NAME: &str = "plugin.json";

/// File name of the per-directory manifest descriptor.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// A discovered filesystem entry with its classification flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPath {
    path: PathBuf,
    is_dir: bool,
    is_manifest: bool,
    is_config: bool,
    manifest_dir: Option<PathBuf>,
}

impl PluginPath {
    /// The root `plugin.json` descriptor.
    pub fn config(path: PathBuf) -> Self {
        Self {
            path,
            is_dir: false,
            is_manifest: false,
            is_config: true,
            manifest_dir: None,
        }
    }

    /// A directory holding a `manifest.json` descriptor.
    pub fn manifest(dir: PathBuf) -> Self {
        Self {
            path: dir,
            is_dir: true,
            is_manifest: true,
            is_config: false,
            manifest_dir: None,
        }
    }

    /// A JSON record file inside a manifest directory.
    pub fn content(path: PathBuf, manifest_dir: PathBuf) -> Self {
        Self {
            path,
            is_dir: false,
            is_manifest: false,
            is_config: false,
            manifest_dir: Some(manifest_dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_manifest(&self) -> bool {
        self.is_manifest
    }

    pub fn is_config(&self) -> bool {
        self.is_config
    }

    /// Whether this entry holds records to install.
    pub fn is_content(&self) -> bool {
        self.manifest_dir.is_some()
    }

    /// The manifest directory enclosing a content file.
    pub fn manifest_dir(&self) -> Option<&Path> {
        self.manifest_dir.as_deref()
    }
}

/// The descriptor loaded from a directory's `manifest.json`.
///
/// # Example
///
/// ```json
/// {
///   "target": "users",
///   "dependencies": ["roles"],
///   "variables": { "default_role": "viewer" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Destination collection for every content file in the directory.
    #[serde(default)]
    pub target: String,

    /// Targets whose records must be installed before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Variables applied after the plugin-level ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

impl PluginManifest {
    /// Collapse repeated dependency names, keeping the first occurrence.
    pub fn dedup_dependencies(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.dependencies.retain(|d| seen.insert(d.clone()));
    }
}

/// The root descriptor loaded from `plugin.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub id: String,

    pub name: String,

    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    /// Container image reference, carried for tooling that builds one.
    #[serde(default)]
    pub image: Option<String>,

    /// Values substituted into `{{placeholder}}` tokens at install time.
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// One manifest directory: its manifest, record files and dependency names.
#[derive(Debug, Clone)]
pub struct PluginContent {
    pub manifest: PluginManifest,

    /// The manifest directory.
    pub dir: PathBuf,

    /// Record files, sorted by file name.
    pub files: Vec<PathBuf>,

    installed: bool,
}

impl PluginContent {
    pub fn new(manifest: PluginManifest, dir: PathBuf, files: Vec<PathBuf>) -> Self {
        Self {
            manifest,
            dir,
            files,
            installed: false,
        }
    }

    pub fn target(&self) -> &str {
        &self.manifest.target
    }

    pub fn dependencies(&self) -> &[String] {
        &self.manifest.dependencies
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Flip the `installed` flag. Returns `false` if it was already set.
    pub fn mark_installed(&mut self) -> bool {
        if self.installed {
            return false;
        }
        self.installed = true;
        true
    }
}

/// The parsed plugin: root descriptor plus every content node keyed by target.
#[derive(Debug, Clone)]
pub struct PluginWrapper {
    pub config: PluginConfig,

    /// Plugin root directory.
    pub root: PathBuf,

    /// Target name to content node, iterated in target order.
    pub content_map: BTreeMap<String, PluginContent>,
}

impl PluginWrapper {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn get(&self, target: &str) -> Option<&PluginContent> {
        self.content_map.get(target)
    }

    pub fn get_mut(&mut self, target: &str) -> Option<&mut PluginContent> {
        self.content_map.get_mut(target)
    }

    /// Resolve a node's dependency names to the nodes themselves.
    ///
    /// Names with no matching node are left out; the dependency checker
    /// reports them before anything relies on this.
    pub fn dependencies_of(&self, target: &str) -> Vec<&PluginContent> {
        self.content_map
            .get(target)
            .map(|node| {
                node.dependencies()
                    .iter()
                    .filter_map(|dep| self.content_map.get(dep))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of record files across all nodes.
    pub fn file_count(&self) -> usize {
        self.content_map.values().map(|c| c.files.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(target: &str, deps: &[&str]) -> PluginManifest {
        PluginManifest {
            target: target.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            variables: None,
        }
    }

    #[test]
    fn test_plugin_path_classification() {
        let cfg = PluginPath::config(PathBuf::from("/p/plugin.json"));
        assert!(cfg.is_config());
        assert!(cfg.is_file());
        assert!(!cfg.is_content());

        let dir = PluginPath::manifest(PathBuf::from("/p/users"));
        assert!(dir.is_manifest());
        assert!(dir.is_dir());
        assert!(!dir.is_content());

        let file = PluginPath::content(
            PathBuf::from("/p/users/admin.json"),
            PathBuf::from("/p/users"),
        );
        assert!(file.is_content());
        assert_eq!(file.manifest_dir(), Some(Path::new("/p/users")));
    }

    #[test]
    fn test_manifest_deserialization_defaults() {
        let m: PluginManifest = serde_json::from_str(r#"{"target": "users"}"#).unwrap();
        assert_eq!(m.target, "users");
        assert!(m.dependencies.is_empty());
        assert!(m.variables.is_none());
    }

    #[test]
    fn test_manifest_dedup_dependencies() {
        let mut m = manifest("users", &["roles", "groups", "roles"]);
        m.dedup_dependencies();
        assert_eq!(m.dependencies, vec!["roles", "groups"]);
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "id": "crm",
            "name": "CRM",
            "version": "1.2.0",
            "author": "Acme",
            "license": "MIT",
            "variables": { "region": "eu", "seats": 5 }
        }"#;
        let cfg: PluginConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.id, "crm");
        assert_eq!(cfg.author.as_deref(), Some("Acme"));
        assert_eq!(cfg.variables["seats"], 5);
        assert!(cfg.image.is_none());
    }

    #[test]
    fn test_config_missing_id_fails() {
        let result: std::result::Result<PluginConfig, _> =
            serde_json::from_str(r#"{"name": "x", "version": "1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_installed_flag_transitions_once() {
        let mut node = PluginContent::new(manifest("users", &[]), PathBuf::from("/p/users"), vec![]);
        assert!(!node.is_installed());
        assert!(node.mark_installed());
        assert!(node.is_installed());
        assert!(!node.mark_installed());
        assert!(node.is_installed());
    }

    #[test]
    fn test_dependencies_of_resolves_nodes() {
        let mut content_map = BTreeMap::new();
        content_map.insert(
            "roles".to_string(),
            PluginContent::new(manifest("roles", &[]), PathBuf::from("/p/roles"), vec![]),
        );
        content_map.insert(
            "users".to_string(),
            PluginContent::new(
                manifest("users", &["roles"]),
                PathBuf::from("/p/users"),
                vec![PathBuf::from("/p/users/a.json")],
            ),
        );
        let wrapper = PluginWrapper {
            config: serde_json::from_str(r#"{"id":"p","name":"P","version":"1"}"#).unwrap(),
            root: PathBuf::from("/p"),
            content_map,
        };

        let deps = wrapper.dependencies_of("users");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].target(), "roles");
        assert_eq!(wrapper.file_count(), 1);
        assert!(wrapper.dependencies_of("missing").is_empty());
    }
}
