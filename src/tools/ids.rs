/// UUID Generator Tool

use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::error::RegistryError;
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};

const MAX_COUNT: i64 = 10;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "generate_uuid",
        "Generate a random UUID (v4).",
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "Number of UUIDs to generate (default: 1, max: 10)",
                    "minimum": 1,
                    "maximum": MAX_COUNT
                }
            },
            "required": []
        }),
    );
    registry.register(tool, handle)
}

fn handle(args: &Value) -> ToolOutput {
    // Out-of-range counts are clamped rather than rejected.
    let count = args
        .get("count")
        .and_then(Value::as_i64)
        .unwrap_or(1)
        .clamp(1, MAX_COUNT);
    let uuids: Vec<String> = (0..count).map(|_| Uuid::new_v4().to_string()).collect();

    let text = if let [single] = uuids.as_slice() {
        format!("UUID: `{single}`")
    } else {
        let lines: Vec<String> = uuids
            .iter()
            .enumerate()
            .map(|(i, uuid)| format!("  {}. `{}`", i + 1, uuid))
            .collect();
        format!("Generated {} UUIDs:\n{}", count, lines.join("\n"))
    };
    Ok(vec![ContentItem::text(text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuids_in(text: &str) -> Vec<Uuid> {
        text.split('`')
            .skip(1)
            .step_by(2)
            .map(|s| Uuid::parse_str(s).unwrap())
            .collect()
    }

    #[test]
    fn defaults_to_one_uuid() {
        let items = handle(&json!({})).unwrap();
        let text = items[0].as_text();
        assert!(text.starts_with("UUID: "));
        let ids = uuids_in(text);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].get_version_num(), 4);
    }

    #[test]
    fn count_is_clamped() {
        let many = handle(&json!({"count": 50})).unwrap();
        assert_eq!(uuids_in(many[0].as_text()).len(), 10);

        let none = handle(&json!({"count": 0})).unwrap();
        assert_eq!(uuids_in(none[0].as_text()).len(), 1);
    }

    #[test]
    fn generated_uuids_are_distinct() {
        let items = handle(&json!({"count": 3})).unwrap();
        let ids = uuids_in(items[0].as_text());
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
    }
}
