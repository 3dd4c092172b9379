//! Builtin tools
//!
//! Tools that need no external service. Enabled per name in `[tools]`.

pub mod current_date;

pub use current_date::CurrentDateTool;

use crate::tools::{Tool, ToolError};

/// Create a builtin tool instance by name
pub fn create_builtin_tool(tool_name: &str) -> Result<Box<dyn Tool>, ToolError> {
    match tool_name {
        "current_date" => Ok(Box::new(CurrentDateTool::new())),
        _ => Err(ToolError::UnknownTool(tool_name.to_string())),
    }
}
