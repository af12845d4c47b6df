//! Structured Output Parser: validates raw generated text against a `SchemaSet`.
//!
//! Strict by construction: a declared field that is absent, null or non-scalar is a
//! hard error, never a default. Lookup is by key, so field order in the text is
//! irrelevant. Two encodings are accepted:
//!   1. a JSON object, optionally wrapped in ``` / ```json fences (what
//!      `format::instructions_for` asks for);
//!   2. a line-oriented `key: value` block, one field per line.
//!
//! Text that contains a `{` or opens a ```json fence is decoded as JSON only. A
//! decode failure there (truncation, trailing commas, repeated keys) is final.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::schema::{is_field_name, SchemaSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed model output: {reason}")]
    MalformedOutput { reason: String },

    #[error("Model output is missing required field '{name}'")]
    MissingField { name: String },
}

/// Field name → extracted value. After a successful `parse` the key set equals the
/// name set of the schema it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParsedResult {
    values: BTreeMap<String, String>,
}

impl ParsedResult {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Like `get`, but reports the absent field by name.
    pub fn require(&self, name: &str) -> Result<&str, ParseError> {
        self.get(name).ok_or_else(|| ParseError::MissingField {
            name: name.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parses `raw_text` into a `ParsedResult` holding exactly the fields of `schema`.
pub fn parse(raw_text: &str, schema: &SchemaSet) -> Result<ParsedResult, ParseError> {
    let text = raw_text.trim();
    if text.is_empty() {
        return Err(malformed("output is empty"));
    }

    let body = fenced_block(text).unwrap_or(text);

    if let Some(span) = brace_span(body) {
        return match serde_json::from_str::<UniqueKeyObject>(span) {
            Ok(UniqueKeyObject(object)) => from_object(object, schema),
            Err(e) => Err(malformed(format!("invalid JSON object: {e}"))),
        };
    }
    if opens_json_fence(text) {
        return Err(malformed("```json block contains no JSON object"));
    }

    match key_value_lines(body, schema)? {
        Some(values) => collect_fields(values, schema),
        None => Err(malformed(
            "no JSON object or `key: value` lines naming the expected fields",
        )),
    }
}

fn malformed(reason: impl Into<String>) -> ParseError {
    ParseError::MalformedOutput {
        reason: reason.into(),
    }
}

/// Body of the first ``` fence (language tag line skipped), if the fence is closed.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn opens_json_fence(text: &str) -> bool {
    text.find("```").is_some_and(|open| {
        text[open + 3..]
            .get(..4)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
    })
}

/// Outermost `{ ... }` span: first opening brace to last closing brace. An unclosed
/// object runs to the end of the text so the JSON error names the truncation.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    match text.rfind('}') {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => Some(&text[start..]),
    }
}

/// Top-level JSON object that fails on a repeated key instead of keeping the last
/// value, so `"True"` cannot be silently overwritten by a later `"False"`.
struct UniqueKeyObject(Map<String, Value>);

impl<'de> Deserialize<'de> for UniqueKeyObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UniqueKeyVisitor;

        impl<'de> Visitor<'de> for UniqueKeyVisitor {
            type Value = UniqueKeyObject;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut object = Map::new();
                while let Some(key) = access.next_key::<String>()? {
                    if object.contains_key(&key) {
                        return Err(de::Error::custom(format_args!("duplicate key `{key}`")));
                    }
                    let value: Value = access.next_value()?;
                    object.insert(key, value);
                }
                Ok(UniqueKeyObject(object))
            }
        }

        deserializer.deserialize_map(UniqueKeyVisitor)
    }
}

fn from_object(object: Map<String, Value>, schema: &SchemaSet) -> Result<ParsedResult, ParseError> {
    let extra: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|k| !schema.contains(k))
        .collect();
    if !extra.is_empty() {
        warn!(keys = ?extra, "Dropping keys outside the expected schema");
    }

    let mut values = BTreeMap::new();
    for name in schema.names() {
        let value = match object.get(name) {
            None | Some(Value::Null) => {
                return Err(ParseError::MissingField {
                    name: name.to_string(),
                })
            }
            Some(Value::String(s)) => s.trim().to_string(),
            // Scalars keep their literal JSON spelling, e.g. `true` stays "true".
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                return Err(malformed(format!(
                    "field '{name}' must be a single value, not a list or object"
                )))
            }
        };
        values.insert(name.to_string(), value);
    }

    Ok(ParsedResult { values })
}

/// Scans a `key: value` block. Lines before the first schema field are preamble and
/// skipped. From that field on, every non-blank line must itself be a `key: value`
/// line, so a value spilling onto a second line is malformed instead of truncated.
/// Returns `None` when no line names a field.
fn key_value_lines(
    text: &str,
    schema: &SchemaSet,
) -> Result<Option<BTreeMap<String, String>>, ParseError> {
    let mut values = BTreeMap::new();
    let mut extra = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        if line.is_empty() {
            continue;
        }
        let entry = line
            .split_once(':')
            .map(|(key, value)| (key.trim().trim_matches(['"', '`', '*']), value));

        match entry {
            Some((key, value)) if schema.contains(key) => {
                let value = strip_quotes(value.trim().trim_end_matches(',').trim());
                if values.insert(key.to_string(), value.to_string()).is_some() {
                    return Err(malformed(format!("field '{key}' appears more than once")));
                }
            }
            _ if values.is_empty() => {}
            Some((key, _)) if is_field_name(key) => extra.push(key),
            _ => {
                return Err(malformed(format!(
                    "line {} is not a `key: value` line; multi-line values are not accepted",
                    index + 1
                )))
            }
        }
    }

    if !extra.is_empty() {
        warn!(keys = ?extra, "Dropping keys outside the expected schema");
    }
    Ok((!values.is_empty()).then_some(values))
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(value)
}

fn collect_fields(
    mut values: BTreeMap<String, String>,
    schema: &SchemaSet,
) -> Result<ParsedResult, ParseError> {
    if let Some(missing) = schema.names().find(|name| !values.contains_key(*name)) {
        return Err(ParseError::MissingField {
            name: missing.to_string(),
        });
    }
    values.retain(|k, _| schema.contains(k));
    Ok(ParsedResult { values })
}
