//! Shared template rendering utilities.
//!
//! Used by the `transform` (template mode) and `http` nodes. Placeholders
//! look like `{{key}}` or `{{ key.path[0] }}` and resolve against the node's
//! gathered inputs.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde_json::{Map, Value};

use crate::expression::extract_from_map;

/// Get the regex for matching `{{ path }}` placeholders.
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("valid regex"))
}

/// How substituted values are written into the output string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Insert the value as-is (default)
    #[default]
    Plain,
    /// Percent-encode the value (URLs)
    Url,
}

/// Convert a JSON value to a string for template substitution.
///
/// Strings are inlined without quotes; everything else is JSON-encoded.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute placeholders in `template` from `inputs`.
///
/// Placeholders that do not resolve are left untouched.
pub fn render_template(template: &str, inputs: &Map<String, Value>, encoding: Encoding) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex_lite::Captures| {
            match extract_from_map(inputs, &caps[1]) {
                Some(value) => {
                    let rendered = value_to_string(value);
                    match encoding {
                        Encoding::Plain => rendered,
                        Encoding::Url => urlencoding::encode(&rendered).into_owned(),
                    }
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Render placeholders in every string of a JSON value recursively.
pub fn render_value(value: &Value, inputs: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(render_template(s, inputs, Encoding::Plain)),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), render_value(v, inputs)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| render_value(v, inputs)).collect()),
        other => other.clone(),
    }
}
