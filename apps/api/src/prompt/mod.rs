#![allow(dead_code)]

//! Prompt Template Engine: `{name}` placeholder substitution with strict variable checks.
//!
//! Syntax: `{identifier}` is a placeholder, `{{` and `}}` are literal braces. Templates
//! are parsed once; rendering fails with `MissingVariable` before anything is sent to
//! the generation service. Substituted values are inserted verbatim and never
//! re-scanned, so values may contain braces (format instructions do).

use std::collections::HashMap;

use thiserror::Error;

use crate::llm_client::ChatMessage;

/// Values supplied at render time, keyed by placeholder name.
pub type Variables<'a> = HashMap<&'a str, &'a str>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template placeholder '{{{name}}}' has no value")]
    MissingVariable { name: String },

    #[error("Unterminated placeholder starting at byte {position}")]
    Unterminated { position: usize },

    #[error("Invalid placeholder '{{{text}}}' at byte {position}")]
    InvalidPlaceholder { text: String, position: usize },

    #[error("Unmatched '}}' at byte {position}")]
    UnmatchedClose { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template. Cheap to render repeatedly; holds no render-time state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn new(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            segments: scan(source)?,
        })
    }

    /// Placeholder names in first-appearance order, without repeats.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitutes every placeholder. Unused entries in `variables` are ignored.
    pub fn render(&self, variables: &Variables<'_>) -> Result<String, TemplateError> {
        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| !variables.contains_key(name))
        {
            return Err(TemplateError::MissingVariable {
                name: missing.to_string(),
            });
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(value) = variables.get(name.as_str()) {
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Renders into the single user message a stage sends, preceded by `system`.
    pub fn render_messages(
        &self,
        system: &str,
        variables: &Variables<'_>,
    ) -> Result<Vec<ChatMessage>, TemplateError> {
        let user = self.render(variables)?;
        Ok(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }
}

/// One-shot render of an unparsed template.
pub fn render(template: &str, variables: &Variables<'_>) -> Result<String, TemplateError> {
    PromptTemplate::new(template)?.render(variables)
}

fn scan(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }
                if !closed {
                    return Err(TemplateError::Unterminated { position });
                }
                if !is_identifier(&name) {
                    return Err(TemplateError::InvalidPlaceholder {
                        text: name,
                        position,
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => return Err(TemplateError::UnmatchedClose { position }),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
