/// Tools Module
///
/// This module contains all tool implementations. Each tool lives in its own
/// module exporting a `register` function that adds the tool's spec and
/// handler to the registry during server initialization.

pub mod calc;
pub mod encoding;
pub mod hash;
pub mod ids;
pub mod json;
pub mod notes;
pub mod system;
pub mod text;

use serde_json::Value;
use std::sync::Arc;

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::ToolRegistry;
use notes::NoteStore;

/// Register the full tool catalog. Registration order is listing order.
pub fn register_all(registry: &mut ToolRegistry, notes: Arc<NoteStore>) -> Result<(), RegistryError> {
    calc::register(registry)?;
    text::register(registry)?;
    system::register(registry)?;
    notes::register(registry, notes)?;
    hash::register(registry)?;
    ids::register(registry)?;
    json::register(registry)?;
    encoding::register(registry)?;
    Ok(())
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument(key.to_string())),
        Some(value) => value
            .as_str()
            .ok_or_else(|| ToolError::invalid(key, "expected a string")),
    }
}
