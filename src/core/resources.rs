/// Read-only Resources
///
/// Two JSON documents are exposed alongside the tools: a dump of all notes and
/// a description of the server. Both are computed on each read.

use serde::Serialize;
use serde_json::{Value, json};

use crate::core::state::AppState;

pub const URI_SCHEME: &str = "kensmcp://";

#[derive(Serialize, Debug, Clone)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

const CATALOG: [(&str, &str, &str); 2] = [
    ("notes", "All Notes", "Access all saved notes"),
    ("server-info", "Server Information", "Information about this server"),
];

pub fn list() -> Vec<ResourceInfo> {
    CATALOG
        .iter()
        .map(|&(key, name, description)| ResourceInfo {
            uri: format!("{URI_SCHEME}{key}"),
            name,
            description,
            mime_type: "application/json",
        })
        .collect()
}

/// Read a resource by short name (`notes`) or full URI (`kensmcp://notes`).
///
/// Returns the canonical URI with the document, or `None` for an unknown
/// resource.
pub fn read(state: &AppState, name: &str) -> Option<(String, Value)> {
    let key = name.strip_prefix(URI_SCHEME).unwrap_or(name);
    let content = match key {
        "notes" => json!(state.notes.snapshot()),
        "server-info" => {
            let tools = state.registry().names();
            let tools_count = tools.len();
            json!({
                "name": state.server_name,
                "version": state.server_version,
                "description": "Utility tool server: calculator, text, hashing, notes and more",
                "tools_count": tools_count,
                "tools": tools,
            })
        }
        _ => return None,
    };
    Some((format!("{URI_SCHEME}{key}"), content))
}
