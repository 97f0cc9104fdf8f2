//! Plugin tree discovery
//!
//! Walks a plugin root directory and classifies what it finds: the root
//! `plugin.json` descriptor, every directory holding a `manifest.json`, and the
//! JSON record files inside those directories.
//!
//! Symbolic links are never followed; they are skipped with a warning so a
//! link cycle cannot trap the walk. Hidden entries are ignored and the walk
//! stops descending past [`MAX_DISCOVERY_DEPTH`].
//!
//! The root itself is never a manifest directory. A `manifest.json` beside
//! `plugin.json` is rejected rather than ignored.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{PlugsmithError, Result};

use super::types::{PluginPath, CONFIG_FILE_NAME, MANIFEST_FILE_NAME};

/// Deepest directory level (root is 0) the walk descends into.
pub const MAX_DISCOVERY_DEPTH: usize = 16;

/// Discover every plugin entry under `root`.
///
/// The returned sequence starts with the config path, followed by manifest
/// directories and content files in sorted path order.
///
/// # Errors
/// - `PlugsmithError::Discovery` if `root` does not exist or is not a directory
/// - `PlugsmithError::Discovery` if `root` has no `plugin.json`
/// - `PlugsmithError::Discovery` if `root` holds a `manifest.json` of its own
/// - `PlugsmithError::Discovery` if no manifest directory was found
pub fn discover(root: &Path) -> Result<Vec<PluginPath>> {
    if !root.exists() {
        return Err(PlugsmithError::Discovery(format!(
            "Plugin root does not exist: {}",
            root.display()
        )));
    }

    if !root.is_dir() {
        return Err(PlugsmithError::Discovery(format!(
            "Plugin root is not a directory: {}",
            root.display()
        )));
    }

    let config_path = root.join(CONFIG_FILE_NAME);
    if !is_regular_file(&config_path) {
        return Err(PlugsmithError::Discovery(format!(
            "No {} found in {}",
            CONFIG_FILE_NAME,
            root.display()
        )));
    }

    if is_regular_file(&root.join(MANIFEST_FILE_NAME)) {
        return Err(PlugsmithError::Discovery(format!(
            "{} in the plugin root {} is not allowed; move it into a subdirectory",
            MANIFEST_FILE_NAME,
            root.display()
        )));
    }

    let mut paths = vec![PluginPath::config(config_path)];
    walk(root, 0, false, &mut paths)?;

    let manifests = paths.iter().filter(|p| p.is_manifest()).count();
    if manifests == 0 {
        return Err(PlugsmithError::Discovery(format!(
            "Plugin root {} contains no directories with a {}",
            root.display(),
            MANIFEST_FILE_NAME
        )));
    }

    info!(
        root = %root.display(),
        manifests,
        files = paths.iter().filter(|p| p.is_content()).count(),
        "Discovered plugin tree"
    );

    Ok(paths)
}

fn walk(dir: &Path, depth: usize, is_manifest_dir: bool, out: &mut Vec<PluginPath>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        PlugsmithError::Discovery(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            PlugsmithError::Discovery(format!("Failed to read directory entry: {}", e))
        })?;
        children.push(entry);
    }
    children.sort_by_key(|e| e.path());

    for entry in children {
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        // file_type() does not traverse links
        let file_type = entry.file_type().map_err(|e| {
            PlugsmithError::Discovery(format!("Failed to stat {}: {}", path.display(), e))
        })?;

        if file_type.is_symlink() {
            warn!(path = %path.display(), "Skipping symbolic link");
            continue;
        }

        if file_type.is_dir() {
            if depth + 1 > MAX_DISCOVERY_DEPTH {
                warn!(
                    path = %path.display(),
                    max_depth = MAX_DISCOVERY_DEPTH,
                    "Directory exceeds maximum depth, skipping"
                );
                continue;
            }

            let has_manifest = is_regular_file(&path.join(MANIFEST_FILE_NAME));
            if has_manifest {
                debug!(dir = %path.display(), "Found manifest directory");
                out.push(PluginPath::manifest(path.clone()));
            }
            walk(&path, depth + 1, has_manifest, out)?;
        } else if file_type.is_file() && is_manifest_dir && is_content_file(&path) {
            out.push(PluginPath::content(path, dir.to_path_buf()));
        }
    }

    Ok(())
}

fn is_content_file(path: &Path) -> bool {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    is_json && path.file_name().map(|n| n != MANIFEST_FILE_NAME).unwrap_or(false)
}

fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}
