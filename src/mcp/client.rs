//! JSON-RPC client for MCP servers over streamable HTTP
//!
//! Every request is a single HTTP POST. Servers answer either with a plain
//! JSON body or with a `text/event-stream` body whose `data:` lines carry the
//! JSON-RPC message. A session id handed out by the server during
//! `initialize` is echoed on every later request.

use super::McpError;
use crate::config::McpSection;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Protocol revision sent during `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

const SESSION_HEADER: &str = "mcp-session-id";

/// Tool advertised by an MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object"})
}

/// Server identity returned by `initialize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerInfo {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo", default)]
    pub server_info: Value,
    #[serde(default)]
    pub capabilities: Value,
}

/// One content block of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
    #[serde(other)]
    Other,
}

impl McpContent {
    fn flatten(&self) -> Option<String> {
        match self {
            McpContent::Text { text } => Some(text.clone()),
            McpContent::Image { mime_type } => Some(format!("[image: {mime_type}]")),
            McpContent::Resource { resource } => resource
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string),
            McpContent::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<McpTool>,
}

#[derive(Debug, Deserialize)]
struct ToolsCallResult {
    #[serde(default)]
    content: Vec<McpContent>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Client for a single MCP server
#[derive(Debug)]
pub struct McpClient {
    http: Client,
    url: String,
    auth_token: Option<String>,
    session_id: RwLock<Option<String>>,
    server_info: RwLock<Option<McpServerInfo>>,
}

impl McpClient {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> Result<Self, McpError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            auth_token,
            session_id: RwLock::new(None),
            server_info: RwLock::new(None),
        })
    }

    /// Build a client from the `[mcp]` configuration section
    pub fn from_section(section: &McpSection, auth_token: Option<String>) -> Result<Self, McpError> {
        if !section.enabled {
            return Err(McpError::Disabled);
        }
        Self::new(
            section.url.clone(),
            Duration::from_secs(section.timeout_secs),
            auth_token,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Server identity, once `initialize` has succeeded
    pub async fn server_info(&self) -> Option<McpServerInfo> {
        self.server_info.read().await.clone()
    }

    /// Perform the initialize handshake and send `notifications/initialized`
    pub async fn initialize(&self) -> Result<McpServerInfo, McpError> {
        info!(url = %self.url, "Initializing MCP session");

        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await?;

        let info: McpServerInfo = serde_json::from_value(result)
            .map_err(|e| McpError::InvalidResponse(format!("initialize result: {e}")))?;

        if info.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                server_version = %info.protocol_version,
                client_version = MCP_PROTOCOL_VERSION,
                "MCP server negotiated a different protocol version"
            );
        }

        self.notify("notifications/initialized").await?;
        *self.server_info.write().await = Some(info.clone());
        Ok(info)
    }

    /// List the tools the server exposes
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let result = self.request("tools/list", Some(json!({}))).await?;
        let list: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| McpError::InvalidResponse(format!("tools/list result: {e}")))?;

        debug!(count = list.tools.len(), "Listed MCP tools");
        Ok(list.tools)
    }

    /// Call a tool and flatten its content blocks into text
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<String, McpError> {
        let result = self
            .request(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;
        let call: ToolsCallResult = serde_json::from_value(result)
            .map_err(|e| McpError::InvalidResponse(format!("tools/call result: {e}")))?;

        let text = call
            .content
            .iter()
            .filter_map(McpContent::flatten)
            .collect::<Vec<_>>()
            .join("\n");

        if call.is_error {
            return Err(McpError::ToolFailed {
                tool: name.to_string(),
                message: text,
            });
        }
        Ok(text)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = Uuid::new_v4().to_string();
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id.clone()),
            method,
            params,
        };

        let response = self.post(&body).await?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.write().await = Some(session.to_string());
        }

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(McpError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let rpc = parse_rpc_body(&content_type, &text, &id)?;
        if let Some(error) = rpc.error {
            return Err(McpError::Protocol {
                code: error.code,
                message: error.message,
            });
        }
        rpc.result
            .ok_or_else(|| McpError::InvalidResponse(format!("{method}: no result")))
    }

    async fn notify(&self, method: &str) -> Result<(), McpError> {
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        };

        let response = self.post(&body).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn post(&self, body: &JsonRpcRequest<'_>) -> Result<reqwest::Response, McpError> {
        let mut request = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(session) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_HEADER, session);
        }

        request
            .send()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))
    }
}

/// Decode a JSON-RPC response from a plain JSON or event-stream body
fn parse_rpc_body(content_type: &str, body: &str, id: &str) -> Result<JsonRpcResponse, McpError> {
    if !content_type.contains("text/event-stream") {
        return serde_json::from_str(body)
            .map_err(|e| McpError::InvalidResponse(format!("malformed JSON-RPC body: {e}")));
    }

    // Servers may interleave notifications; pick the message answering our id.
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(data.trim()).ok())
        .find(|message| message.id.as_ref().and_then(Value::as_str) == Some(id))
        .ok_or_else(|| {
            McpError::InvalidResponse("event stream carried no response for the request".to_string())
        })
}
