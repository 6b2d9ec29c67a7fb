/// JSON Formatter Tool
///
/// Key order from the input document is preserved in every operation.

use serde_json::{Value, json};

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "json_format",
        "Format, validate, or minify JSON data.",
        json!({
            "type": "object",
            "properties": {
                "json_string": {
                    "type": "string",
                    "description": "JSON string to process"
                },
                "operation": {
                    "type": "string",
                    "enum": ["format", "minify", "validate"],
                    "description": "Operation to perform"
                }
            },
            "required": ["json_string", "operation"]
        }),
    );
    registry.register(tool, handle)
}

fn handle(args: &Value) -> ToolOutput {
    let source = required_str(args, "json_string")?;
    let operation = required_str(args, "operation")?;
    let parsed: Value = serde_json::from_str(source)?;

    let text = match operation {
        "validate" => "Valid JSON!".to_string(),
        "minify" => format!("Minified:\n`{}`", serde_json::to_string(&parsed)?),
        "format" => format!(
            "Formatted:\n```json\n{}\n```",
            serde_json::to_string_pretty(&parsed)?
        ),
        other => {
            return Err(ToolError::invalid(
                "operation",
                format!("unknown operation: {other}"),
            ));
        }
    };
    Ok(vec![ContentItem::text(text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, operation: &str) -> ToolOutput {
        handle(&json!({"json_string": source, "operation": operation}))
    }

    #[test]
    fn format_pretty_prints_in_source_key_order() {
        let items = run(r#"{"z":1,"a":[true,null]}"#, "format").unwrap();
        assert_eq!(
            items[0].as_text(),
            "Formatted:\n```json\n{\n  \"z\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}\n```"
        );
    }

    #[test]
    fn minify_strips_whitespace() {
        let items = run("{ \"b\" : 2 ,\n \"a\" : 1 }", "minify").unwrap();
        assert_eq!(items[0].as_text(), "Minified:\n`{\"b\":2,\"a\":1}`");
    }

    #[test]
    fn validate_accepts_any_document() {
        let items = run("[1, 2, 3]", "validate").unwrap();
        assert_eq!(items[0].as_text(), "Valid JSON!");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(run("{\"a\":", "validate"), Err(ToolError::Json(_))));
    }
}
