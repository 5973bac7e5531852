use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use gan_engine::{GanEngine, ToolRequest};

const TOOL_NAME: &str = "gan_audit";

/// Line-delimited JSON-RPC 2.0 stdio loop. The default (but not only legal)
/// realization of the tool transport layer the core treats as out-of-scope.
pub(crate) async fn run(engine: Arc<GanEngine>) -> Result<()> {
    info!("starting gan-audit-server on stdio");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read line from stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!(request = trimmed, "received");

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                error!(error = %e, "failed to parse JSON-RPC request");
                write_response(
                    &stdout,
                    &JsonRpcResponse::error(None, -32700, format!("parse error: {e}")),
                )?;
                continue;
            }
        };

        let response = handle_request(&engine, request).await;
        if let Some(response) = response {
            write_response(&stdout, &response)?;
        }
    }

    info!("stdin closed; shutting down");
    Ok(())
}

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    id: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

impl JsonRpcResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

#[derive(Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

fn tool_definition() -> Value {
    serde_json::json!({
        "name": TOOL_NAME,
        "description": "Submit a thought (code, a patch, or prose) for adversarial audit and \
                         get back a structured review plus a directive on whether to iterate again.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "thought": {"type": "string"},
                "thoughtNumber": {"type": "integer", "minimum": 1},
                "totalThoughts": {"type": "integer", "minimum": 1},
                "nextThoughtNeeded": {"type": "boolean"},
                "isRevision": {"type": "boolean"},
                "revisesThought": {"type": "integer"},
                "branchFromThought": {"type": "integer"},
                "branchId": {"type": "string"},
                "loopId": {"type": "string"},
                "needsMoreThoughts": {"type": "boolean"}
            },
            "required": ["thought", "thoughtNumber", "totalThoughts", "nextThoughtNeeded"]
        }
    })
}

async fn handle_request(engine: &Arc<GanEngine>, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => Some(JsonRpcResponse::ok(
            id,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": "gan-audit-server",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )),
        "notifications/initialized" => None,
        "tools/list" => Some(JsonRpcResponse::ok(
            id,
            serde_json::json!({"tools": [tool_definition()]}),
        )),
        "tools/call" => {
            let response = match handle_tool_call(engine, request.params).await {
                Ok(result) => JsonRpcResponse::ok(id, result),
                Err(e) => JsonRpcResponse::error(id, -32603, e.to_string()),
            };
            Some(response)
        }
        "shutdown" => Some(JsonRpcResponse::ok(id, serde_json::json!({}))),
        other => Some(JsonRpcResponse::error(
            id,
            -32601,
            format!("method not found: {other}"),
        )),
    }
}

async fn handle_tool_call(engine: &Arc<GanEngine>, params: Option<Value>) -> Result<Value> {
    let params = params.context("missing params for tools/call")?;
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .context("missing tool name")?;
    if name != TOOL_NAME {
        anyhow::bail!("unknown tool: {name}");
    }
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    let request: ToolRequest =
        serde_json::from_value(arguments).context("arguments do not match the tool schema")?;

    let response = engine.process(request).await?;
    let text = serde_json::to_string(&response)?;

    Ok(serde_json::json!({
        "content": [{"type": "text", "text": text}]
    }))
}

fn write_response(stdout: &std::io::Stdout, response: &JsonRpcResponse) -> Result<()> {
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, response).context("failed to serialize response")?;
    out.write_all(b"\n").context("failed to write newline")?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}
