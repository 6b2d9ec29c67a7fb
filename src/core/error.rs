/// Error Types
///
/// Every failure a tool call can produce is represented here so the dispatch
/// engine can hand callers a typed result instead of a raw fault:
/// - `ToolError`: raised by a handler or by argument validation
/// - `ToolCallError`: what `Dispatcher::execute` returns on failure
/// - `RegistryError`: raised while the tool table is being built at startup
/// - `NoteStoreError`: raised by the persisted note store

use thiserror::Error;

/// Failure produced while validating arguments or running a tool handler.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("invalid expression: {0}")]
    Expression(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 input: {0}")]
    Decode(String),

    #[error("note storage failed: {0}")]
    Storage(#[from] NoteStoreError),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl ToolError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failure returned from the dispatch boundary.
///
/// The display form is what callers see in the `error` field of an HTTP
/// response or the text of an `isError` JSON-RPC result.
#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: {source}")]
    Failed {
        tool: String,
        #[source]
        source: ToolError,
    },
}

impl ToolCallError {
    pub fn is_unknown_tool(&self) -> bool {
        matches!(self, ToolCallError::UnknownTool(_))
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("tool registered twice: {0}")]
    DuplicateTool(String),
}

#[derive(Error, Debug)]
pub enum NoteStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notes document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_message_names_the_tool() {
        let err = ToolCallError::UnknownTool("nope".into());
        assert_eq!(err.to_string(), "unknown tool: nope");
        assert!(err.is_unknown_tool());
    }

    #[test]
    fn failed_call_is_prefixed_with_tool_name() {
        let err = ToolCallError::Failed {
            tool: "calculate".into(),
            source: ToolError::Expression("unexpected end of input".into()),
        };
        assert_eq!(
            err.to_string(),
            "calculate: invalid expression: unexpected end of input"
        );
        assert!(!err.is_unknown_tool());
    }
}
