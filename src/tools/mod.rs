//! Tool system shared by every agent
//!
//! Tools are either builtin (selected by configuration) or discovered on an
//! MCP server and registered through [`crate::mcp::McpToolAdapter`].
//! Parameters are validated against the tool's JSON schema before execution.

use crate::config::ToolConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod builtin;

/// Tool interface
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON schema of the parameters
    fn describe(&self) -> ToolDescription;

    /// Apply configuration from the `[tools]` table; called once at registration
    async fn initialize(&mut self, _config: Option<&Value>) -> Result<(), ToolError> {
        Ok(())
    }

    /// Run the tool with parameters already validated against `describe()`
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool description handed to the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of tools available to agents
#[derive(Default, Clone)]
pub struct ToolSystem {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[tools]` configuration table
    pub async fn from_config(tool_configs: &HashMap<String, ToolConfig>) -> Result<Self, ToolError> {
        let mut system = Self::new();

        for (tool_name, tool_config) in tool_configs {
            let mut tool = match tool_config.implementation() {
                "builtin" => builtin::create_builtin_tool(tool_name)?,
                other => return Err(ToolError::UnknownImplementation(other.to_string())),
            };

            let config = match tool_config {
                ToolConfig::Simple(_) => None,
                ToolConfig::Complex { config, .. } => Some(
                    serde_json::to_value(config)
                        .map_err(|e| ToolError::InitializationError(e.to_string()))?,
                ),
            };
            tool.initialize(config.as_ref()).await?;

            system.register(Arc::from(tool));
        }

        Ok(system)
    }

    /// Register a tool under the name it describes itself with
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.describe().name;
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Register every tool of `other`, replacing same-named tools
    pub fn extend(&mut self, other: &ToolSystem) {
        for (name, tool) in &other.tools {
            self.tools.insert(name.clone(), Arc::clone(tool));
        }
    }

    /// Get tool description
    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions of every registered tool, sorted by name
    pub fn describe_all(&self) -> Vec<ToolDescription> {
        self.list_tools()
            .iter()
            .filter_map(|name| self.describe_tool(name))
            .collect()
    }

    /// Execute tool with validated parameters
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        Self::validate_parameters(&tool.describe(), parameters)?;

        tool.execute(parameters).await
    }

    fn validate_parameters(description: &ToolDescription, parameters: &Value) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    /// Registered tool names, sorted
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSystem")
            .field("tools", &self.list_tools())
            .finish()
    }
}

/// Tool system errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Unknown tool implementation: {0}")]
    UnknownImplementation(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "echo".to_string(),
                description: "Echo the message".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
            }
        }

        async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
            Ok(json!({"echo": parameters["message"]}))
        }
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let tool_system = ToolSystem::new();
        assert!(tool_system.is_empty());
        assert!(tool_system.describe_all().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Arc::new(EchoTool));

        let result = tool_system
            .execute_tool("echo", &json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn test_parameters_are_validated() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Arc::new(EchoTool));

        let result = tool_system.execute_tool("echo", &json!({"message": 42})).await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));

        let result = tool_system.execute_tool("echo", &json!({})).await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_from_config_builtin() {
        let mut configs = HashMap::new();
        configs.insert(
            "current_date".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );

        let tool_system = ToolSystem::from_config(&configs).await.unwrap();
        assert_eq!(tool_system.list_tools(), vec!["current_date".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_tool_implementation() {
        let mut configs = HashMap::new();
        configs.insert(
            "current_date".to_string(),
            ToolConfig::Simple("plugin".to_string()),
        );

        let result = ToolSystem::from_config(&configs).await;
        assert!(matches!(result, Err(ToolError::UnknownImplementation(_))));
    }

    #[tokio::test]
    async fn test_unknown_builtin_tool() {
        let mut configs = HashMap::new();
        configs.insert(
            "web_search".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );

        let result = ToolSystem::from_config(&configs).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let tool_system = ToolSystem::new();
        let result = tool_system.execute_tool("missing", &json!({})).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }
}
