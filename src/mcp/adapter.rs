//! Exposes remote MCP tools through the [`Tool`] trait

use super::{McpClient, McpError, McpTool};
use crate::tools::{Tool, ToolDescription, ToolError, ToolSystem};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// A single MCP tool bound to the client that can call it
pub struct McpToolAdapter {
    client: Arc<McpClient>,
    tool: McpTool,
}

impl McpToolAdapter {
    pub fn new(client: Arc<McpClient>, tool: McpTool) -> Self {
        Self { client, tool }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.tool.name.clone(),
            description: self.tool.description.clone(),
            parameters: self.tool.input_schema.clone(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        debug!(tool = %self.tool.name, server = %self.client.url(), "Calling MCP tool");

        let text = self
            .client
            .call_tool(&self.tool.name, parameters)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        Ok(json!({ "content": text }))
    }
}

/// Discover the server's tools and register each one; returns how many were added
pub async fn register_mcp_tools(
    client: Arc<McpClient>,
    tool_system: &mut ToolSystem,
) -> Result<usize, McpError> {
    let tools = client.list_tools().await?;
    let count = tools.len();

    for tool in tools {
        tool_system.register(Arc::new(McpToolAdapter::new(Arc::clone(&client), tool)));
    }

    info!(count, server = %client.url(), "Registered MCP tools");
    Ok(count)
}
