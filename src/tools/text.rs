/// Text Transform Tool

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"));

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "text_transform",
        "Transform text: uppercase, lowercase, title case, reverse, count words/chars, or slugify.",
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to transform"
                },
                "operation": {
                    "type": "string",
                    "enum": ["uppercase", "lowercase", "titlecase", "reverse", "word_count", "char_count", "slugify"],
                    "description": "The transformation to apply"
                }
            },
            "required": ["text", "operation"]
        }),
    );
    registry.register(tool, handle)
}

fn handle(args: &Value) -> ToolOutput {
    let text = required_str(args, "text")?;
    let operation = required_str(args, "operation")?;
    let result = transform(text, operation)?;
    Ok(vec![ContentItem::text(format!("Result: {result}"))])
}

fn transform(text: &str, operation: &str) -> Result<String, ToolError> {
    let result = match operation {
        "uppercase" => text.to_uppercase(),
        "lowercase" => text.to_lowercase(),
        "titlecase" => titlecase(text),
        "reverse" => text.chars().rev().collect(),
        "word_count" => text.split_whitespace().count().to_string(),
        "char_count" => text.chars().count().to_string(),
        "slugify" => NON_SLUG
            .replace_all(&text.to_lowercase(), "-")
            .trim_matches('-')
            .to_string(),
        other => {
            return Err(ToolError::invalid(
                "operation",
                format!("unknown operation: {other}"),
            ));
        }
    };
    Ok(result)
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn titlecase(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
