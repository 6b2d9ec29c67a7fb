/// Base64 Encoder/Decoder Tool
///
/// The single content item is the converted value itself, so the output of
/// one direction can be fed straight back into the other.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "base64_convert",
        "Encode or decode Base64 strings.",
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to encode or Base64 string to decode"
                },
                "operation": {
                    "type": "string",
                    "enum": ["encode", "decode"],
                    "description": "Whether to encode or decode"
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

    let converted = match operation {
        "encode" => STANDARD.encode(text.as_bytes()),
        "decode" => {
            let bytes = STANDARD
                .decode(text.trim())
                .map_err(|e| ToolError::Decode(e.to_string()))?;
            String::from_utf8(bytes)
                .map_err(|_| ToolError::Decode("decoded bytes are not valid UTF-8".into()))?
        }
        other => {
            return Err(ToolError::invalid(
                "operation",
                format!("unknown operation: {other}"),
            ));
        }
    };
    Ok(vec![ContentItem::text(converted)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, operation: &str) -> ToolOutput {
        handle(&json!({"text": text, "operation": operation}))
    }

    #[test]
    fn encodes_with_standard_alphabet() {
        assert_eq!(run("Hello", "encode").unwrap(), vec![ContentItem::text("SGVsbG8=")]);
        assert_eq!(run("", "encode").unwrap(), vec![ContentItem::text("")]);
    }

    #[test]
    fn decodes_and_tolerates_surrounding_whitespace() {
        assert_eq!(run(" SGVsbG8=\n", "decode").unwrap(), vec![ContentItem::text("Hello")]);
    }

    #[test]
    fn invalid_input_is_a_decode_error() {
        assert!(matches!(run("not base64!", "decode"), Err(ToolError::Decode(_))));
        // 0xff 0xfe is valid base64 but not UTF-8
        assert!(matches!(run("//4=", "decode"), Err(ToolError::Decode(_))));
    }
}
