//! Tool registry behavior as agents see it

use async_trait::async_trait;
use parallel_agents::config::ToolConfig;
use parallel_agents::tools::{Tool, ToolDescription, ToolError, ToolSystem};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

struct LookupTool;

#[async_trait]
impl Tool for LookupTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "lookup".to_string(),
            description: "Look up a capital city".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"country": {"type": "string", "minLength": 1}},
                "required": ["country"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        match parameters["country"].as_str() {
            Some("France") => Ok(json!({"capital": "Paris"})),
            Some(other) => Err(ToolError::ExecutionError(format!("unknown country {other}"))),
            None => Err(ToolError::ExecutionError("missing country".to_string())),
        }
    }
}

#[tokio::test]
async fn test_builtin_date_tool_from_complex_config() {
    let mut configs = HashMap::new();
    configs.insert(
        "current_date".to_string(),
        ToolConfig::Complex {
            implementation: "builtin".to_string(),
            config: HashMap::from([("utc_offset_hours".to_string(), json!(0))]),
        },
    );

    let tools = ToolSystem::from_config(&configs).await.unwrap();
    let result = tools.execute_tool("current_date", &json!({})).await.unwrap();

    assert_eq!(result["utc_offset_hours"], 0);
    assert!(result["iso8601"].as_str().unwrap().ends_with("+00:00"));
}

#[tokio::test]
async fn test_schema_rejects_before_execution() {
    let mut tools = ToolSystem::new();
    tools.register(Arc::new(LookupTool));

    let extra_field = tools
        .execute_tool("lookup", &json!({"country": "France", "city": "Lyon"}))
        .await;
    assert!(matches!(extra_field, Err(ToolError::ValidationError(_))));

    let empty = tools.execute_tool("lookup", &json!({"country": ""})).await;
    assert!(matches!(empty, Err(ToolError::ValidationError(_))));
}

#[tokio::test]
async fn test_execution_errors_surface_unchanged() {
    let mut tools = ToolSystem::new();
    tools.register(Arc::new(LookupTool));

    let ok = tools
        .execute_tool("lookup", &json!({"country": "France"}))
        .await
        .unwrap();
    assert_eq!(ok, json!({"capital": "Paris"}));

    let err = tools
        .execute_tool("lookup", &json!({"country": "Atlantis"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Tool execution failed: unknown country Atlantis");
}

#[tokio::test]
async fn test_extend_merges_registries() {
    let mut base = ToolSystem::new();
    base.register(Arc::new(LookupTool));

    let mut configs = HashMap::new();
    configs.insert(
        "current_date".to_string(),
        ToolConfig::Simple("builtin".to_string()),
    );
    let extra = ToolSystem::from_config(&configs).await.unwrap();

    base.extend(&extra);
    assert_eq!(base.list_tools(), vec!["current_date", "lookup"]);
    assert_eq!(base.describe_all().len(), 2);
}
