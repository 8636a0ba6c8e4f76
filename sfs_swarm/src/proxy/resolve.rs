//! Proxy endpoint list resolution from configuration sources.

use super::selector::DEFAULT_ROTATE_EVERY;
use serde_json::Value;
use std::path::Path;

/// Environment variables consulted when no configured source yields anything
pub const PROXY_ENV_VARS: [&str; 4] = ["HTTPS_PROXY", "HTTP_PROXY", "https_proxy", "http_proxy"];

/// Raw proxy fields as they appear in the configuration document
#[derive(Debug, Clone, Default)]
pub struct ProxySources<'a> {
    /// Array of endpoints, or a string separated by newlines/commas
    pub list: Option<&'a Value>,
    /// File with one endpoint per line
    pub list_file: Option<&'a str>,
    /// Single endpoint
    pub url: Option<&'a str>,
    /// Single endpoint, used when `url` is absent
    pub proxy: Option<&'a str>,
}

/// Resolve endpoints using the process environment as the last fallback.
pub fn resolve_proxy_list(sources: &ProxySources<'_>, base_dir: &Path) -> Vec<String> {
    resolve_proxy_list_with_env(sources, base_dir, |key| std::env::var(key).ok())
}

/// Resolve endpoints from the first configured source that yields any,
/// in precedence order: list field, list file, single endpoint, environment.
/// Values are trimmed, blanks dropped, and duplicates removed keeping the
/// first occurrence.
pub fn resolve_proxy_list_with_env<F>(
    sources: &ProxySources<'_>,
    base_dir: &Path,
    env: F,
) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = from_list_field(sources.list);

    if resolved.is_empty() {
        resolved = from_list_file(sources.list_file, base_dir);
    }

    if resolved.is_empty() {
        let single = sources
            .url
            .filter(|u| !u.trim().is_empty())
            .or(sources.proxy);
        resolved.extend(single.and_then(clean_endpoint));
    }

    if resolved.is_empty() {
        let from_env = PROXY_ENV_VARS
            .iter()
            .find_map(|key| env(key).filter(|v| !v.trim().is_empty()));
        resolved.extend(from_env.as_deref().and_then(clean_endpoint));
    }

    dedupe(resolved)
}

fn from_list_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| value_to_string(item).as_deref().and_then(clean_endpoint))
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => value_to_string(other)
            .map(|text| {
                text.split(['\r', '\n', ','])
                    .filter_map(clean_endpoint)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn from_list_file(file: Option<&str>, base_dir: &Path) -> Vec<String> {
    let Some(file) = file.filter(|f| !f.trim().is_empty()) else {
        return Vec::new();
    };
    let path = Path::new(file);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    // A missing or unreadable file contributes nothing.
    match std::fs::read_to_string(&path) {
        Ok(contents) => contents
            .lines()
            .filter_map(clean_endpoint)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Parse `proxyRotateEvery`, falling back to the default for anything that
/// is not a positive integer.
pub fn resolve_rotate_every(value: Option<&Value>) -> usize {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_leading_int(s),
        _ => None,
    };

    match parsed {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_ROTATE_EVERY,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn clean_endpoint(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn dedupe(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for item in list {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
