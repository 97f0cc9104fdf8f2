//! Placeholder substitution for plugin content files
//!
//! Content files may contain `{{key}}` tokens anywhere a JSON string appears.
//! A token that makes up the whole string is replaced by the variable's own
//! JSON value, so `"{{enabled}}"` can become `true` or `42`. Tokens embedded in
//! longer strings are replaced by the variable's textual form.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{PlugsmithError, Result};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex is valid")
});

static WHOLE_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}$").expect("placeholder regex is valid")
});

/// Substitute placeholders in `value` using `variables`.
///
/// Returns a new value; the input is never modified. Unknown placeholders are
/// left as written unless `strict` is set, in which case the first unknown key
/// is reported as [`PlugsmithError::Resolution`]. Object keys are not
/// substituted.
///
/// # Example
///
/// ```
/// use plugsmith::plugins::resolve;
/// use serde_json::json;
///
/// let vars = json!({"flag": true}).as_object().unwrap().clone();
/// let out = resolve(&json!({"x": "{{flag}}"}), &vars, false).unwrap();
/// assert_eq!(out, json!({"x": true}));
/// ```
pub fn resolve(value: &Value, variables: &Map<String, Value>, strict: bool) -> Result<Value> {
    match value {
        Value::String(s) => resolve_str(s, variables, strict),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, variables, strict))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), resolve(item, variables, strict)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Every distinct placeholder key referenced anywhere in `value`.
pub fn placeholders(value: &Value) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect_placeholders(value, &mut keys);
    keys
}

fn collect_placeholders(value: &Value, keys: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for caps in PLACEHOLDER_RE.captures_iter(s) {
                keys.insert(caps[1].to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, keys)),
        Value::Object(map) => map.values().for_each(|v| collect_placeholders(v, keys)),
        _ => {}
    }
}

fn resolve_str(s: &str, variables: &Map<String, Value>, strict: bool) -> Result<Value> {
    if let Some(caps) = WHOLE_PLACEHOLDER_RE.captures(s) {
        let key = &caps[1];
        return match variables.get(key) {
            Some(v) => Ok(v.clone()),
            None if strict => Err(PlugsmithError::Resolution {
                key: key.to_string(),
            }),
            None => Ok(Value::String(s.to_string())),
        };
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(s) {
        let Some(token) = caps.get(0) else {
            continue;
        };
        let key = &caps[1];
        out.push_str(&s[last..token.start()]);
        match variables.get(key) {
            Some(v) => out.push_str(&text_form(v)),
            None if strict => {
                return Err(PlugsmithError::Resolution {
                    key: key.to_string(),
                })
            }
            None => out.push_str(token.as_str()),
        }
        last = token.end();
    }
    out.push_str(&s[last..]);

    Ok(Value::String(out))
}

fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
