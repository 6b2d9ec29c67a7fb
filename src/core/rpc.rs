/// JSON-RPC 2.0 Binding
///
/// Request/response structures and the method router shared by the HTTP
/// `/mcp` endpoint and the stdio transport. Supported methods:
/// - `initialize`: static server info (no capability negotiation)
/// - `ping`
/// - `tools/list`, `tools/call`
/// - `resources/list`, `resources/read`

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::resources;
use crate::core::state::AppState;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request. A missing `id` marks a notification.
#[derive(Deserialize, Debug)]
pub struct RpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response carrying either a result or an error.
#[derive(Serialize, Debug)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize, Debug)]
pub struct RpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RpcResponse {
    pub fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Route a request to its method handler.
///
/// Notifications are accepted and produce no response.
pub async fn handle_request(state: &AppState, req: RpcRequest) -> Option<RpcResponse> {
    let Some(id) = req.id else {
        tracing::debug!(method = %req.method, "notification received");
        return None;
    };
    let id = Some(id);

    let response = match req.method.as_str() {
        "initialize" => RpcResponse::result(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": state.server_name,
                    "version": state.server_version
                }
            }),
        ),
        "ping" => RpcResponse::result(id, json!({})),
        "tools/list" => RpcResponse::result(id, json!({ "tools": state.registry().list() })),
        "tools/call" => handle_tools_call(state, id, req.params).await,
        "resources/list" => RpcResponse::result(id, json!({ "resources": resources::list() })),
        "resources/read" => handle_resources_read(state, id, req.params).await,
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };
    Some(response)
}

async fn handle_tools_call(state: &AppState, id: Option<Value>, params: Option<Value>) -> RpcResponse {
    let Some(params) = params else {
        return RpcResponse::error(id, INVALID_PARAMS, "Invalid params");
    };
    let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
        return RpcResponse::error(id, INVALID_PARAMS, "Invalid params: missing tool name");
    };
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    state.metrics.record_tool_call();
    match state.dispatcher.call(tool_name.to_string(), arguments).await {
        Ok(content) => RpcResponse::result(id, json!({ "content": content, "isError": false })),
        Err(e) if e.is_unknown_tool() => RpcResponse::error(id, METHOD_NOT_FOUND, e.to_string()),
        Err(e) => RpcResponse::result(
            id,
            json!({
                "content": [{ "type": "text", "text": format!("Error: {e}") }],
                "isError": true
            }),
        ),
    }
}

async fn handle_resources_read(state: &AppState, id: Option<Value>, params: Option<Value>) -> RpcResponse {
    let Some(uri) = params.as_ref().and_then(|p| p.get("uri")).and_then(Value::as_str) else {
        return RpcResponse::error(id, INVALID_PARAMS, "Invalid params: missing uri");
    };
    // The notes snapshot takes the store lock; keep it off the executor.
    let lookup = {
        let state = state.clone();
        let uri = uri.to_string();
        tokio::task::spawn_blocking(move || resources::read(&state, &uri)).await
    };
    let lookup = match lookup {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::error!(error = %e, uri, "resource read task failed");
            return RpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {e}"));
        }
    };
    match lookup {
        Some((uri, content)) => RpcResponse::result(
            id,
            json!({
                "contents": [{
                    "uri": uri,
                    "mimeType": "application/json",
                    "text": content.to_string()
                }]
            }),
        ),
        None => RpcResponse::error(id, INVALID_PARAMS, format!("Unknown resource: {uri}")),
    }
}
