//! Stdio MCP adapter
//!
//! Newline-delimited JSON-RPC 2.0 exposing `initialize`, `tools/list` and
//! `tools/call` on top of a `ToolExecutor`.

use crate::tools::executor::ToolExecutor;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "taskbridge";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Clone, Deserialize)]
pub struct MCPRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPError {
    pub code: i32,
    pub message: String,
}

impl MCPResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct MCPServer {
    executor: Arc<ToolExecutor>,
}

impl MCPServer {
    pub fn new(executor: Arc<ToolExecutor>) -> Self {
        Self { executor }
    }

    /// Handle one request. Notifications (no id) get no response.
    pub async fn handle(&self, request: MCPRequest) -> Option<MCPResponse> {
        let id = request.id?;

        let response = match request.method.as_str() {
            "initialize" => MCPResponse::result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            "ping" => MCPResponse::result(id, json!({})),
            "tools/list" => {
                let tools = self.executor.definitions().await;
                MCPResponse::result(id, json!({ "tools": tools }))
            }
            "tools/call" => match serde_json::from_value::<CallParams>(request.params) {
                Ok(params) => {
                    let result = self.executor.execute(&params.name, params.arguments).await;
                    match serde_json::to_value(result) {
                        Ok(value) => MCPResponse::result(id, value),
                        Err(e) => MCPResponse::error(id, INVALID_PARAMS, e.to_string()),
                    }
                }
                Err(e) => MCPResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
            },
            other => MCPResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        Some(response)
    }

    /// Serve requests line by line until the reader closes
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<MCPRequest>(&line) {
                Ok(request) => {
                    tracing::debug!("MCP request: {}", request.method);
                    self.handle(request).await
                }
                Err(e) => {
                    tracing::warn!("Malformed MCP request: {}", e);
                    Some(MCPResponse::error(Value::Null, PARSE_ERROR, e.to_string()))
                }
            };

            if let Some(response) = response {
                let json = serde_json::to_string(&response)?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        tracing::info!("MCP input closed, shutting down");
        Ok(())
    }

    pub async fn serve_stdio(&self) -> Result<()> {
        tracing::info!("Serving MCP over stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}
