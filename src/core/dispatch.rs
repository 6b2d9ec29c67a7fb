/// Dispatch Engine
///
/// Resolves a tool name against the registry, checks the arguments against the
/// tool's input schema, and runs the handler. Whatever happens inside the
/// handler (an error return or a panic) comes back as a `ToolCallResult`; no
/// fault escapes this boundary.

use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::error::{ToolCallError, ToolError};
use crate::core::registry::{ContentItem, ToolRegistry, ToolSpec};

pub type ToolCallResult = Result<Vec<ContentItem>, ToolCallError>;

/// Stateless front door to the tool registry.
///
/// Cloning is cheap; every clone shares the same frozen registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a tool synchronously on the calling thread.
    pub fn execute(&self, tool_name: &str, arguments: &Value) -> ToolCallResult {
        let Some((spec, handler)) = self.registry.get(tool_name) else {
            tracing::debug!(tool = tool_name, "unknown tool requested");
            return Err(ToolCallError::UnknownTool(tool_name.to_string()));
        };

        let failed = |source: ToolError| ToolCallError::Failed {
            tool: tool_name.to_string(),
            source,
        };

        let empty = Value::Object(Map::new());
        let arguments = if arguments.is_null() { &empty } else { arguments };
        validate_arguments(spec, arguments).map_err(failed)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.execute(arguments)))
            .unwrap_or_else(|payload| Err(ToolError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(items) => {
                tracing::debug!(tool = tool_name, items = items.len(), "tool call succeeded");
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(tool = tool_name, error = %e, "tool call failed");
                Err(failed(e))
            }
        }
    }

    /// Execute a tool on the blocking thread pool.
    ///
    /// Handlers may do file I/O (the note tools), so async transports call
    /// this instead of `execute` to keep their executor threads free.
    pub async fn call(&self, tool_name: String, arguments: Value) -> ToolCallResult {
        let dispatcher = self.clone();
        let name = tool_name.clone();
        match tokio::task::spawn_blocking(move || dispatcher.execute(&name, &arguments)).await {
            Ok(result) => result,
            Err(join_error) => Err(ToolCallError::Failed {
                tool: tool_name,
                source: ToolError::Panicked(join_error.to_string()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Check arguments against the subset of JSON Schema the tool catalog uses:
/// object shape, `required` keys, `string`/`integer` property types and
/// `enum` value sets. Keys the schema does not describe are ignored.
fn validate_arguments(spec: &ToolSpec, arguments: &Value) -> Result<(), ToolError> {
    let Some(args) = arguments.as_object() else {
        return Err(ToolError::invalid("arguments", "expected a JSON object"));
    };

    let schema = &spec.input_schema;
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(ToolError::MissingArgument(key.to_string()));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(property) = properties.get(key) else {
            continue;
        };

        match property.get("type").and_then(Value::as_str) {
            Some("string") if !value.is_string() => {
                return Err(ToolError::invalid(key, "expected a string"));
            }
            Some("integer") if !(value.is_i64() || value.is_u64()) => {
                return Err(ToolError::invalid(key, "expected an integer"));
            }
            _ => {}
        }

        if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
                return Err(ToolError::invalid(
                    key,
                    format!("expected one of {}, got {}", options.join(", "), value),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ToolOutput;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new(
                    "shout",
                    "uppercase a word",
                    json!({
                        "type": "object",
                        "properties": {
                            "word": {"type": "string"},
                            "style": {"type": "string", "enum": ["loud", "louder"]},
                            "times": {"type": "integer"}
                        },
                        "required": ["word"]
                    }),
                ),
                |args: &Value| -> ToolOutput {
                    let word = args["word"].as_str().unwrap_or_default().to_uppercase();
                    let times = args.get("times").and_then(Value::as_u64).unwrap_or(1);
                    Ok((0..times).map(|_| ContentItem::text(word.clone())).collect())
                },
            )
            .unwrap();
        registry
            .register(ToolSpec::new("explode", "always panics", json!({})), |_: &Value| -> ToolOutput {
                panic!("boom")
            })
            .unwrap();
        registry
            .register(ToolSpec::new("refuse", "always fails", json!({})), |_: &Value| -> ToolOutput {
                Err(ToolError::Expression("bad input".into()))
            })
            .unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    #[test]
    fn executes_registered_tool() {
        let items = dispatcher().execute("shout", &json!({"word": "hi", "times": 2})).unwrap();
        assert_eq!(items, vec![ContentItem::text("HI"), ContentItem::text("HI")]);
    }

    #[test]
    fn unknown_tool_is_reported() {
        let err = dispatcher().execute("nonexistent_tool", &json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn missing_required_argument_is_a_reported_error() {
        let err = dispatcher().execute("shout", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "shout: missing required argument: word");
    }

    #[test]
    fn null_arguments_are_treated_as_empty_object() {
        let err = dispatcher().execute("shout", &Value::Null).unwrap_err();
        assert!(matches!(
            err,
            ToolCallError::Failed { source: ToolError::MissingArgument(_), .. }
        ));
    }

    #[test]
    fn enum_and_type_violations_are_rejected() {
        let d = dispatcher();
        let err = d.execute("shout", &json!({"word": "a", "style": "quiet"})).unwrap_err();
        assert!(err.to_string().contains("style"));

        let err = d.execute("shout", &json!({"word": 7})).unwrap_err();
        assert!(err.to_string().contains("expected a string"));

        let err = d.execute("shout", &json!({"word": "a", "times": "2"})).unwrap_err();
        assert!(err.to_string().contains("expected an integer"));

        let err = d.execute("shout", &json!(["word"])).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn handler_error_is_prefixed_with_tool_name() {
        let err = dispatcher().execute("refuse", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "refuse: invalid expression: bad input");
    }

    #[test]
    fn handler_panic_is_caught() {
        let err = dispatcher().execute("explode", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "explode: handler panicked: boom");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_do_not_interfere() {
        let d = dispatcher();
        let mut handles = Vec::new();
        for i in 0..32u64 {
            let d = d.clone();
            handles.push(tokio::spawn(async move {
                let times = i % 4 + 1;
                let items = d
                    .call("shout".into(), json!({"word": format!("w{i}"), "times": times}))
                    .await
                    .unwrap();
                (i, times, items)
            }));
        }
        for handle in handles {
            let (i, times, items) = handle.await.unwrap();
            assert_eq!(items.len() as u64, times);
            assert!(items.iter().all(|item| item.as_text() == format!("W{i}")));
        }
    }
}
