/// System Information Tool
///
/// Reports local time, platform details, the working directory and a fixed
/// allow-list of environment variables as a pretty-printed JSON block.

use serde_json::{Map, Value, json};
use sysinfo::System;

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

/// Environment variables that are safe to expose.
const SAFE_ENV_VARS: [&str; 5] = ["USER", "HOME", "SHELL", "LANG", "PATH"];

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "system_info",
        "Get system information: current time, platform, environment variables, or working directory.",
        json!({
            "type": "object",
            "properties": {
                "info_type": {
                    "type": "string",
                    "enum": ["time", "platform", "env", "cwd", "all"],
                    "description": "Type of system information to retrieve"
                }
            },
            "required": ["info_type"]
        }),
    );
    registry.register(tool, handle)
}

fn handle(args: &Value) -> ToolOutput {
    let info_type = required_str(args, "info_type")?;
    let info = collect(info_type)?;
    let formatted = serde_json::to_string_pretty(&Value::Object(info))?;
    Ok(vec![ContentItem::text(format!(
        "System Information:\n```json\n{formatted}\n```"
    ))])
}

fn collect(info_type: &str) -> Result<Map<String, Value>, ToolError> {
    if !matches!(info_type, "time" | "platform" | "env" | "cwd" | "all") {
        return Err(ToolError::invalid(
            "info_type",
            format!("unknown info type: {info_type}"),
        ));
    }
    let wants = |section: &str| info_type == section || info_type == "all";
    let mut info = Map::new();

    if wants("time") {
        let now = chrono::Local::now();
        info.insert("current_time".into(), json!(now.to_rfc3339()));
        info.insert("timezone".into(), json!(now.format("%:z").to_string()));
    }

    if wants("platform") {
        info.insert("system".into(), json!(std::env::consts::OS));
        info.insert("family".into(), json!(std::env::consts::FAMILY));
        info.insert("machine".into(), json!(std::env::consts::ARCH));
        info.insert("os_name".into(), json!(System::name()));
        info.insert("os_version".into(), json!(System::os_version()));
        info.insert("kernel_version".into(), json!(System::kernel_version()));
        info.insert("hostname".into(), json!(System::host_name()));
    }

    if wants("cwd") {
        let cwd = std::env::current_dir()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|e| format!("unavailable: {e}"));
        info.insert("working_directory".into(), json!(cwd));
    }

    if wants("env") {
        let environment: Map<String, Value> = SAFE_ENV_VARS
            .iter()
            .map(|key| {
                let value = std::env::var(key).unwrap_or_else(|_| "N/A".to_string());
                (key.to_string(), json!(value))
            })
            .collect();
        info.insert("environment".into(), Value::Object(environment));
    }

    Ok(info)
}
