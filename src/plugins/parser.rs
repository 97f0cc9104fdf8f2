//! Structural parsing of a discovered plugin tree
//!
//! Turns the flat list of classified paths into a [`PluginWrapper`]: the root
//! descriptor plus one [`PluginContent`] node per manifest directory, keyed by
//! the manifest's `target`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PlugsmithError, Result};

use super::types::{
    PluginConfig, PluginContent, PluginManifest, PluginPath, PluginWrapper, MANIFEST_FILE_NAME,
};

/// Build the content tree from discovered paths.
///
/// # Errors
/// - `PlugsmithError::Parse` if there is no config path or a descriptor is malformed
/// - `PlugsmithError::Parse` if a manifest has no `target`
/// - `PlugsmithError::Parse` if two files in one directory collide by name
/// - `PlugsmithError::Parse` if two manifests declare the same `target`
pub fn parse(paths: &[PluginPath]) -> Result<PluginWrapper> {
    let config_path = paths
        .iter()
        .find(|p| p.is_config() && p.is_file())
        .ok_or_else(|| PlugsmithError::Parse("No plugin config among discovered paths".into()))?;

    let config: PluginConfig = read_json(config_path.path())?;
    if config.id.trim().is_empty() {
        return Err(PlugsmithError::Parse(format!(
            "Plugin config {} has an empty id",
            config_path.path().display()
        )));
    }

    let root = config_path
        .path()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut grouped: HashMap<&Path, Vec<PathBuf>> = HashMap::new();
    for path in paths.iter().filter(|p| p.is_content() && p.is_file()) {
        if let Some(dir) = path.manifest_dir() {
            grouped.entry(dir).or_default().push(path.path().to_path_buf());
        }
    }

    let mut content_map: BTreeMap<String, PluginContent> = BTreeMap::new();
    for dir in paths.iter().filter(|p| p.is_manifest() && p.is_dir()) {
        let manifest_path = dir.path().join(MANIFEST_FILE_NAME);
        let mut manifest: PluginManifest = read_json(&manifest_path)?;

        if manifest.target.trim().is_empty() {
            return Err(PlugsmithError::Parse(format!(
                "Manifest {} is missing 'target'",
                manifest_path.display()
            )));
        }
        manifest.dedup_dependencies();

        let files = grouped.remove(dir.path()).unwrap_or_default();
        let files = check_file_names(dir.path(), files)?;

        let target = manifest.target.clone();
        if let Some(existing) = content_map.get(&target) {
            return Err(PlugsmithError::Parse(format!(
                "Target '{}' is declared by both {} and {}",
                target,
                existing.dir.display(),
                dir.path().display()
            )));
        }

        debug!(
            collection = %target,
            files = files.len(),
            dependencies = ?manifest.dependencies,
            "Parsed manifest"
        );
        content_map.insert(
            target,
            PluginContent::new(manifest, dir.path().to_path_buf(), files),
        );
    }

    if let Some(orphan_dir) = grouped.keys().next() {
        return Err(PlugsmithError::Parse(format!(
            "Content files reference {} which is not a manifest directory",
            orphan_dir.display()
        )));
    }

    Ok(PluginWrapper {
        config,
        root,
        content_map,
    })
}

/// Sort a directory's files by name and reject names that collide.
///
/// Names are compared case-insensitively so a tree copied between
/// filesystems installs the same records.
fn check_file_names(dir: &Path, mut files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for file in &files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if let Some(previous) = seen.insert(name, file) {
            return Err(PlugsmithError::Parse(format!(
                "File name collision in {}: {} and {}",
                dir.display(),
                previous.display(),
                file.display()
            )));
        }
    }

    Ok(files)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        PlugsmithError::Parse(format!("Failed to read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| PlugsmithError::Parse(format!("Malformed JSON in {}: {}", path.display(), e)))
}
