//! Locator-based access into JSON templates
//!
//! Scaffold templates are filled in by writing values at locators such as
//! `$.pks[0].key` or `$.meta["display name"]`. A purely numeric segment is an
//! array index, whether written as `[0]` or `.0`.
//!
//! Setting a value creates whatever objects and arrays the locator walks
//! through. When an existing value has the wrong shape for the next segment it
//! is replaced outright, so anything previously stored under it is lost.

use serde_json::{Map, Value};

use crate::error::{PlugsmithError, Result};

/// Largest array index a locator may name. Setting an index pads the array
/// with `null` up to it, so the bound caps that allocation.
pub const MAX_LOCATOR_INDEX: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Write `value` at `locator` inside `root`.
///
/// # Example
///
/// ```
/// use plugsmith::plugins::set_path;
/// use serde_json::json;
///
/// let mut doc = json!({});
/// set_path(&mut doc, "$.pks[0].key", json!("id")).unwrap();
/// assert_eq!(doc, json!({"pks": [{"key": "id"}]}));
/// ```
pub fn set_path(root: &mut Value, locator: &str, value: Value) -> Result<()> {
    let segments = parse_locator(locator)?;

    let mut current = root;
    for segment in &segments {
        current = step_mut(current, segment);
    }
    *current = value;

    Ok(())
}

/// Read the value at `locator`, if present. Invalid locators read as absent.
pub fn get_path<'v>(root: &'v Value, locator: &str) -> Option<&'v Value> {
    let segments = parse_locator(locator).ok()?;

    segments
        .iter()
        .try_fold(root, |current, segment| match segment {
            Segment::Key(key) => current.as_object()?.get(key),
            Segment::Index(idx) => current.as_array()?.get(*idx),
        })
}

/// Instantiate a scaffold template by writing each `(locator, value)` pair in
/// order. Later pairs win when locators overlap.
pub fn apply_values(template: &Value, values: &[(String, Value)]) -> Result<Value> {
    let mut out = template.clone();
    for (locator, value) in values {
        set_path(&mut out, locator, value.clone())?;
    }
    Ok(out)
}

fn step_mut<'v>(current: &'v mut Value, segment: &Segment) -> &'v mut Value {
    match segment {
        Segment::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            // objects insert Null for a missing key
            &mut current[key.as_str()]
        }
        Segment::Index(idx) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            if let Some(items) = current.as_array_mut() {
                let len = idx.saturating_add(1);
                if items.len() < len {
                    items.resize(len, Value::Null);
                }
            }
            &mut current[*idx]
        }
    }
}

fn parse_locator(locator: &str) -> Result<Vec<Segment>> {
    let rest = locator.strip_prefix('$').ok_or_else(|| {
        PlugsmithError::Template(format!("Locator '{}' must start with '$'", locator))
    })?;

    let chars: Vec<char> = rest.chars().collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                if name.is_empty() {
                    return Err(PlugsmithError::Template(format!(
                        "Locator '{}' has an empty segment",
                        locator
                    )));
                }
                segments.push(segment_from(&name, locator)?);
            }
            '[' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(PlugsmithError::Template(format!(
                        "Locator '{}' has an unterminated '['",
                        locator
                    )));
                }
                let raw: String = chars[start..i].iter().collect();
                i += 1;

                let raw = raw.trim();
                if let Some(quoted) = unquote(raw) {
                    segments.push(Segment::Key(quoted.to_string()));
                } else if raw.is_empty() {
                    return Err(PlugsmithError::Template(format!(
                        "Locator '{}' has an empty '[]' segment",
                        locator
                    )));
                } else {
                    segments.push(segment_from(raw, locator)?);
                }
            }
            other => {
                return Err(PlugsmithError::Template(format!(
                    "Unexpected '{}' in locator '{}'",
                    other, locator
                )));
            }
        }
    }

    Ok(segments)
}

fn unquote(raw: &str) -> Option<&str> {
    ['"', '\''].iter().find_map(|q| {
        raw.strip_prefix(*q)
            .and_then(|s| s.strip_suffix(*q))
            .filter(|_| raw.len() >= 2)
    })
}

fn segment_from(name: &str, locator: &str) -> Result<Segment> {
    if !name.chars().all(|c| c.is_ascii_digit()) {
        return Ok(Segment::Key(name.to_string()));
    }
    match name.parse::<usize>() {
        Ok(idx) if idx <= MAX_LOCATOR_INDEX => Ok(Segment::Index(idx)),
        _ => Err(PlugsmithError::Template(format!(
            "Index {} in locator '{}' exceeds the maximum of {}",
            name, locator, MAX_LOCATOR_INDEX
        ))),
    }
}
