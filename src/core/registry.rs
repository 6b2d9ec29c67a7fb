/// Tool Registry
///
/// Holds the catalog of tools the server exposes: one `ToolSpec` (name,
/// description, input schema) and one handler per tool. The registry is
/// filled once during startup and then frozen behind an `Arc`, after which it
/// is only ever read.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{RegistryError, ToolError};

/// Tool definition as advertised to clients.
///
/// Serializes with the JSON-RPC field names (`inputSchema`); the REST listing
/// renames the schema to `parameters` itself.
#[derive(Serialize, Debug, Clone)]
pub struct ToolSpec {
    /// Unique tool identifier (e.g., "calculate", "note_create")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// One unit of tool output. Only text is produced today.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    #[cfg(test)]
    pub fn as_text(&self) -> &str {
        match self {
            ContentItem::Text { text } => text,
        }
    }
}

/// What a tool body returns: its output items in display order, or the
/// reason it could not produce them.
pub type ToolOutput = Result<Vec<ContentItem>, ToolError>;

/// Uniform interface every tool body implements.
///
/// Handlers receive the raw argument object and return their output in
/// display order. Plain closures implement this through the blanket impl
/// below, so most tools register a function directly.
pub trait ToolHandler: Send + Sync {
    fn execute(&self, args: &Value) -> ToolOutput;
}

impl<F> ToolHandler for F
where
    F: Fn(&Value) -> ToolOutput + Send + Sync,
{
    fn execute(&self, args: &Value) -> ToolOutput {
        self(args)
    }
}

/// Registry of available tools.
///
/// `tools` keeps registration order for listing; `handlers` maps each name to
/// its implementation for dispatch.
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool with the registry.
    ///
    /// Fails if a tool with the same name was already registered.
    pub fn register<H>(&mut self, tool: ToolSpec, handler: H) -> Result<(), RegistryError>
    where
        H: ToolHandler + 'static,
    {
        if self.handlers.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool(tool.name));
        }
        self.handlers.insert(tool.name.clone(), Arc::new(handler));
        self.tools.push(tool);
        Ok(())
    }

    /// All registered tools, in registration order.
    pub fn list(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<(&ToolSpec, &Arc<dyn ToolHandler>)> {
        let handler = self.handlers.get(name)?;
        let spec = self.tools.iter().find(|tool| tool.name == name)?;
        Some((spec, handler))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(text: &'static str) -> impl ToolHandler {
        move |_: &Value| -> ToolOutput { Ok(vec![ContentItem::text(text)]) }
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(ToolSpec::new(name, "test", json!({"type": "object"})), constant(name))
                .unwrap();
        }

        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), registry.names());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        let spec = ToolSpec::new("echo", "test", json!({}));
        registry.register(spec.clone(), constant("a")).unwrap();

        let err = registry.register(spec, constant("b")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_resolves_spec_and_handler() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("hello", "says hi", json!({})), constant("hi"))
            .unwrap();

        let (spec, handler) = registry.get("hello").unwrap();
        assert_eq!(spec.description, "says hi");
        assert_eq!(handler.execute(&json!({})).unwrap(), vec![ContentItem::text("hi")]);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn content_item_serializes_as_typed_text() {
        let item = ContentItem::text("hello");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"type": "text", "text": "hello"})
        );
    }
}
