#![allow(dead_code)]

//! Schema Registry: named output fields that a stage's generated text must carry.
//!
//! A `SchemaSet` is the output contract for one stage. It is built once at startup;
//! configuration mistakes (duplicate or malformed names) surface here, never at parse time.

use serde::Serialize;
use thiserror::Error;

pub mod format;
pub mod parser;

pub use format::instructions_for;
pub use parser::{parse, ParseError, ParsedResult};

/// Literal the generation service is told to use when a field is absent from the input.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Field name cannot be empty")]
    EmptyName,

    #[error("Field name '{name}' must contain only ASCII letters, digits and underscores")]
    InvalidName { name: String },

    #[error("Field '{name}' is defined more than once in the same schema set")]
    DuplicateField { name: String },

    #[error("A schema set needs at least one field")]
    Empty,
}

/// A single named output field plus the instruction describing what goes in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    name: String,
    description: String,
}

impl FieldSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Defines a field. Names are validated when the field joins a `SchemaSet`.
pub fn define(name: impl Into<String>, description: impl Into<String>) -> FieldSchema {
    FieldSchema {
        name: name.into(),
        description: description.into(),
    }
}

/// Ordered, duplicate-free set of fields. Order only affects the rendered format
/// instructions; parsing looks fields up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSet {
    fields: Vec<FieldSchema>,
}

/// Groups fields into a `SchemaSet`, rejecting empty, malformed or duplicated names.
pub fn group(fields: impl IntoIterator<Item = FieldSchema>) -> Result<SchemaSet, SchemaError> {
    let mut collected: Vec<FieldSchema> = Vec::new();

    for field in fields {
        validate_name(&field.name)?;
        if collected.iter().any(|f| f.name == field.name) {
            return Err(SchemaError::DuplicateField { name: field.name });
        }
        collected.push(field);
    }

    if collected.is_empty() {
        return Err(SchemaError::Empty);
    }

    Ok(SchemaSet { fields: collected })
}

impl SchemaSet {
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Names double as JSON keys and as `key: value` line prefixes, so they must not
// contain separators.
fn validate_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    if !is_field_name(name) {
        return Err(SchemaError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
