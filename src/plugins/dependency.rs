//! Manifest dependency validation
//!
//! Every `dependencies` entry must name a target some manifest provides, and
//! the resulting graph must be acyclic. Both checks run before any record is
//! sent to the engine.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{PlugsmithError, Result};

use super::types::PluginContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Validate the dependency graph of a parsed plugin.
///
/// # Errors
/// - `PlugsmithError::MissingDependency` naming the unknown target and the
///   manifest that referenced it
/// - `PlugsmithError::DependencyCycle` with the first cycle found, listed in
///   traversal order and closed by repeating its first target
pub fn check(content_map: &BTreeMap<String, PluginContent>) -> Result<()> {
    for (target, node) in content_map {
        for dep in node.dependencies() {
            if !content_map.contains_key(dep) {
                return Err(PlugsmithError::MissingDependency {
                    missing: dep.clone(),
                    referencer: target.clone(),
                });
            }
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    for target in content_map.keys() {
        if let Some(cycle) = visit(target, content_map, &mut marks, &mut stack) {
            return Err(PlugsmithError::DependencyCycle(cycle));
        }
    }

    debug!(nodes = content_map.len(), "Dependency graph is acyclic");
    Ok(())
}

fn visit<'a>(
    target: &'a str,
    content_map: &'a BTreeMap<String, PluginContent>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    match marks.get(target) {
        Some(Mark::Done) => return None,
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|t| *t == target).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..].iter().map(|t| t.to_string()).collect();
            cycle.push(target.to_string());
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(target, Mark::InProgress);
    stack.push(target);

    if let Some(node) = content_map.get(target) {
        for dep in node.dependencies() {
            if let Some(cycle) = visit(dep, content_map, marks, stack) {
                return Some(cycle);
            }
        }
    }

    stack.pop();
    marks.insert(target, Mark::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::types::PluginManifest;
    use std::path::PathBuf;

    fn graph(edges: &[(&str, &[&str])]) -> BTreeMap<String, PluginContent> {
        edges
            .iter()
            .map(|(target, deps)| {
                let manifest = PluginManifest {
                    target: target.to_string(),
                    dependencies: deps.iter().map(|d| d.to_string()).collect(),
                    variables: None,
                };
                (
                    target.to_string(),
                    PluginContent::new(manifest, PathBuf::from(target), vec![]),
                )
            })
            .collect()
    }

    #[test]
    fn test_check_accepts_dag() {
        let map = graph(&[
            ("users", &["roles", "groups"]),
            ("roles", &["groups"]),
            ("groups", &[]),
            ("audit", &["users", "roles"]),
        ]);
        assert!(check(&map).is_ok());
    }

    #[test]
    fn test_check_empty_graph() {
        assert!(check(&BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_check_missing_dependency_names_both_ends() {
        let map = graph(&[("users", &["roles"])]);
        match check(&map).unwrap_err() {
            PlugsmithError::MissingDependency { missing, referencer } => {
                assert_eq!(missing, "roles");
                assert_eq!(referencer, "users");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_reports_three_node_cycle() {
        let map = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        match check(&map).unwrap_err() {
            PlugsmithError::DependencyCycle(cycle) => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_cycle_reached_from_outside() {
        let map = graph(&[("entry", &["x"]), ("x", &["y"]), ("y", &["x"])]);
        match check(&map).unwrap_err() {
            PlugsmithError::DependencyCycle(cycle) => {
                assert_eq!(cycle, vec!["x", "y", "x"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_self_dependency() {
        let map = graph(&[("loop", &["loop"])]);
        let err = check(&map).unwrap_err();
        assert!(err.to_string().contains("loop -> loop"));
    }

    #[test]
    fn test_check_diamond_is_not_a_cycle() {
        let map = graph(&[
            ("top", &["left", "right"]),
            ("left", &["bottom"]),
            ("right", &["bottom"]),
            ("bottom", &[]),
        ]);
        assert!(check(&map).is_ok());
    }
}
