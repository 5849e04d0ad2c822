use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

// `{{ .Key }}`, `{{ .Data.field }}`, `{{ .Key | default "fallback" }}`
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is hardcoded and validated - it is a compile-time constant in practice
    Regex::new(r#"\{\{\s*\.([A-Za-z_][A-Za-z0-9_.]*)\s*(?:\|\s*default\s+"([^"]*)"\s*)?\}\}"#)
        .expect("hardcoded placeholder regex is invalid - fix source code")
});

fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Substitute placeholders in `template` from `data`, HTML-escaping values.
///
/// Unknown or empty keys render as their `default` or as nothing.
pub fn render(template: &str, data: &Map<String, Value>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            let value = lookup(data, &caps[1]).and_then(display);
            let fallback = caps.get(2).map(|m| m.as_str().to_string());
            escape_html(&value.or(fallback).unwrap_or_default())
        })
        .into_owned()
}
