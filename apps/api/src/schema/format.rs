//! Format-Instruction Generator: turns a `SchemaSet` into the textual output contract
//! injected into a stage prompt.
//!
//! The contract asks for a single JSON object inside a ```json fence, one string value
//! per field. `schema::parser` accepts exactly that shape (and a plain `key: value`
//! block as a fallback), so the two must change together.

use crate::schema::{SchemaSet, UNKNOWN};

/// Renders the format instructions for `schema`. Pure and deterministic.
pub fn instructions_for(schema: &SchemaSet) -> String {
    let mut out = String::new();

    out.push_str(
        "The output must be a single JSON object inside a markdown code block that starts \
         with \"```json\" and ends with \"```\". Do not write anything before or after the block.\n",
    );
    out.push_str(
        "Use each field name below as a key and your answer as a string value. \
         Every key is required and no other keys are allowed.\n",
    );
    out.push_str(&format!(
        "If the information for a field is not present, use the string \"{UNKNOWN}\".\n\n"
    ));

    out.push_str("Fields:\n");
    for field in schema.fields() {
        out.push_str(&format!(
            "- \"{}\": {}\n",
            field.name(),
            collapse_whitespace(field.description())
        ));
    }

    out.push_str("\nExpected shape:\n```json\n{\n");
    let last = schema.len().saturating_sub(1);
    for (i, field) in schema.fields().iter().enumerate() {
        let comma = if i == last { "" } else { "," };
        out.push_str(&format!("  \"{}\": \"<string>\"{comma}\n", field.name()));
    }
    out.push_str("}\n```");

    out
}

/// Descriptions are written as indented multi-line literals; the contract shows each on one line.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
