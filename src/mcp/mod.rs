//! MCP tool server support
//!
//! A minimal client for MCP servers reachable over streamable HTTP, and an
//! adapter that exposes each remote tool through the crate's [`Tool`] trait
//! so agents can call it like any builtin tool.
//!
//! [`Tool`]: crate::tools::Tool

pub mod adapter;
pub mod client;

pub use adapter::{register_mcp_tools, McpToolAdapter};
pub use client::{McpClient, McpContent, McpServerInfo, McpTool, MCP_PROTOCOL_VERSION};

use thiserror::Error;

/// MCP client errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP server is disabled")]
    Disabled,

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("MCP server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("MCP protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Invalid MCP response: {0}")]
    InvalidResponse(String),

    #[error("MCP tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },
}
