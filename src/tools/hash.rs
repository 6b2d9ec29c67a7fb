/// Hash Generator Tool

use serde_json::{Value, json};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "generate_hash",
        "Generate hash of text using MD5, SHA1, SHA256, or SHA512.",
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to hash"
                },
                "algorithm": {
                    "type": "string",
                    "enum": ["md5", "sha1", "sha256", "sha512"],
                    "description": "Hash algorithm to use"
                }
            },
            "required": ["text", "algorithm"]
        }),
    );
    registry.register(tool, handle)
}

fn handle(args: &Value) -> ToolOutput {
    let text = required_str(args, "text")?;
    let algorithm = required_str(args, "algorithm")?;
    let digest = hex_digest(algorithm, text.as_bytes())?;
    Ok(vec![ContentItem::text(format!(
        "{}: `{}`",
        algorithm.to_uppercase(),
        digest
    ))])
}

fn hex_digest(algorithm: &str, data: &[u8]) -> Result<String, ToolError> {
    let digest = match algorithm {
        "md5" => format!("{:x}", md5::compute(data)),
        "sha1" => hex::encode(Sha1::digest(data)),
        "sha256" => hex::encode(Sha256::digest(data)),
        "sha512" => hex::encode(Sha512::digest(data)),
        other => {
            return Err(ToolError::invalid(
                "algorithm",
                format!("unknown algorithm: {other}"),
            ));
        }
    };
    Ok(digest)
}
