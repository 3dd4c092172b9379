//! Integrated parallel processor
//!
//! Like the parallel DataFrame processor, but the component chooses the
//! agent's tools itself from a JSON tool configuration and separates answers
//! with a visible rule.

use super::base::{answer_with_agent, run_rows, DEFAULT_MAX_WORKERS};
use super::{unknown_input, ComponentDescriptor, InputDescriptor, OutputDescriptor, Processor};
use crate::agent::{AgentFactory, AgentSpec};
use crate::config::ToolConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::processing::{
    combine_results_as_string, parse_max_workers, ProcessedRow, ProcessorKind, RowAnswer,
};
use crate::tools::ToolSystem;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const COMPONENT: &str = "IntegratedParallelProcessor";

/// Separator between row answers in the string output
pub const INTEGRATED_SEPARATOR: &str = "\n---\n";

pub struct IntegratedParallelProcessor {
    factory: Arc<dyn AgentFactory>,
    pub agent_system_prompt: String,
    /// `{"name": "builtin", ..}` or `["name", ..]`; empty keeps the default tools
    pub tool_configurations: String,
    pub max_workers: String,
}

impl IntegratedParallelProcessor {
    pub fn new(factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            factory,
            agent_system_prompt: String::new(),
            tool_configurations: String::new(),
            max_workers: DEFAULT_MAX_WORKERS.to_string(),
        }
    }

    pub fn describe() -> ComponentDescriptor {
        ComponentDescriptor {
            name: COMPONENT,
            display_name: "Integrated Parallel Processor",
            description: "Processes DataFrame rows in parallel with integrated tool calling \
                          capabilities",
            icon: "cpu",
            processor_type: ProcessorKind::Integrated,
            inputs: vec![
                InputDescriptor::text(
                    "dataframe_input",
                    "DataFrame Input",
                    "Input DataFrame with a 'text' column to process",
                ),
                InputDescriptor::text(
                    "agent_system_prompt",
                    "Agent System Prompt",
                    "System prompt for the agent that processes each query",
                )
                .advanced(),
                InputDescriptor::text(
                    "tool_configurations",
                    "Tool Configurations (JSON)",
                    "JSON configuration selecting the tools available to the agent",
                )
                .advanced(),
                InputDescriptor::text(
                    "max_workers",
                    "Max Workers",
                    "Maximum number of parallel workers (default: 4)",
                )
                .advanced()
                .with_value("4"),
            ],
            outputs: vec![
                OutputDescriptor::text(
                    "processed_results",
                    "Processed Results",
                    "build_processed_results",
                ),
                OutputDescriptor::detailed_results(),
            ],
        }
    }

    /// Tool set selected by `tool_configurations`, if any
    async fn selected_tools(&self) -> ProcessorResult<Option<Arc<ToolSystem>>> {
        let Some(configs) = parse_tool_configurations(&self.tool_configurations)? else {
            return Ok(None);
        };
        let tools = ToolSystem::from_config(&configs).await?;
        debug!(tools = ?tools.list_tools(), "Selected tools");
        Ok(Some(Arc::new(tools)))
    }
}

/// Parse the tool configuration input
///
/// Accepts an object mapping tool names to implementations (the `[tools]`
/// config syntax) or a list of builtin tool names.
pub fn parse_tool_configurations(
    raw: &str,
) -> ProcessorResult<Option<HashMap<String, ToolConfig>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| {
        ProcessorError::invalid_input(format!("tool_configurations is not valid JSON: {e}"))
    })?;

    let configs = match value {
        Value::Array(names) => names
            .into_iter()
            .map(|name| match name {
                Value::String(name) => Ok((name, ToolConfig::Simple("builtin".to_string()))),
                other => Err(ProcessorError::invalid_input(format!(
                    "tool_configurations list entries must be tool names, got {other}"
                ))),
            })
            .collect::<ProcessorResult<HashMap<_, _>>>()?,
        object @ Value::Object(_) => serde_json::from_value(object).map_err(|e| {
            ProcessorError::invalid_input(format!("invalid tool_configurations: {e}"))
        })?,
        other => {
            return Err(ProcessorError::invalid_input(format!(
                "tool_configurations must be a JSON object or list, got {other}"
            )))
        }
    };

    Ok(Some(configs))
}

#[async_trait]
impl Processor for IntegratedParallelProcessor {
    fn descriptor(&self) -> ComponentDescriptor {
        Self::describe()
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Integrated
    }

    fn set_input(&mut self, name: &str, value: &str) -> ProcessorResult<()> {
        match name {
            "agent_system_prompt" => self.agent_system_prompt = value.to_string(),
            "tool_configurations" => self.tool_configurations = value.to_string(),
            "max_workers" => self.max_workers = value.to_string(),
            other => return Err(unknown_input(COMPONENT, other)),
        }
        Ok(())
    }

    async fn process_rows(&self, rows: Vec<String>) -> ProcessorResult<Vec<ProcessedRow>> {
        let tools = self.selected_tools().await?;
        let max_workers = parse_max_workers(Some(&self.max_workers), DEFAULT_MAX_WORKERS);
        let factory = Arc::clone(&self.factory);
        let system_prompt = Some(self.agent_system_prompt.clone());

        Ok(run_rows(self.kind(), rows, max_workers, move |ctx| {
            let factory = Arc::clone(&factory);
            let spec = AgentSpec::named(format!("integrated_{}", ctx.row_index))
                .with_system_prompt(system_prompt.clone())
                .with_tools(tools.clone());
            async move {
                let reply = answer_with_agent(factory.as_ref(), spec, &ctx.query).await?;
                Ok(RowAnswer::from(reply))
            }
        })
        .await)
    }

    fn combine(&self, rows: &[ProcessedRow]) -> String {
        combine_results_as_string(rows, INTEGRATED_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentSettings, LlmAgentFactory};
    use crate::llm::provider::ToolCall;
    use crate::testing::mocks::{MockLlmProvider, MockResponse, StubAgentFactory};
    use serde_json::json;

    #[test]
    fn test_parse_tool_configurations_forms() {
        assert!(parse_tool_configurations("").unwrap().is_none());

        let from_list = parse_tool_configurations(r#"["current_date"]"#)
            .unwrap()
            .unwrap();
        assert_eq!(from_list["current_date"].implementation(), "builtin");

        let from_object = parse_tool_configurations(
            r#"{"current_date": {"impl": "builtin", "config": {"utc_offset_hours": 1}}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(from_object["current_date"].implementation(), "builtin");
    }

    #[test]
    fn test_parse_tool_configurations_rejects_garbage() {
        assert!(parse_tool_configurations("{not json").is_err());
        assert!(parse_tool_configurations("[1, 2]").is_err());
        assert!(parse_tool_configurations("42").is_err());
    }

    #[tokio::test]
    async fn test_answers_joined_with_rule() {
        let processor = IntegratedParallelProcessor::new(Arc::new(StubAgentFactory::echo()));
        let output = processor.build_processed_results(&json!(["a", "b"])).await;
        assert_eq!(output, "Response to: a\n---\nResponse to: b");
    }

    #[tokio::test]
    async fn test_bad_tool_configuration_fails_the_batch() {
        let mut processor = IntegratedParallelProcessor::new(Arc::new(StubAgentFactory::echo()));
        processor
            .set_input("tool_configurations", r#"["web_search"]"#)
            .unwrap();

        let text = processor.build_processed_results(&json!(["a"])).await;
        assert!(text.starts_with("Error processing DataFrame: "));

        let detailed = processor.build_detailed_results(&json!(["a"])).await;
        assert!(detailed.is_error());
    }

    #[tokio::test]
    async fn test_selected_tools_reach_the_model() {
        let provider = Arc::new(MockLlmProvider::scripted(vec![
            MockResponse::ToolCalls(vec![ToolCall {
                id: "call_0".to_string(),
                name: "current_date".to_string(),
                arguments: json!({}),
            }]),
            MockResponse::Text("It is today.".to_string()),
        ]));
        let factory = LlmAgentFactory::new(
            provider.clone(),
            Arc::new(ToolSystem::new()),
            AgentSettings::new("mock-model").without_current_date(),
        );
        let mut processor = IntegratedParallelProcessor::new(Arc::new(factory));
        processor
            .set_input("tool_configurations", r#"{"current_date": "builtin"}"#)
            .unwrap();

        let output = processor
            .build_detailed_results(&json!(["What day is it?"]))
            .await
            .to_value();

        assert_eq!(output["results"][0]["response"], "It is today.");
        assert_eq!(output["tool_usage"]["current_date"], 1);
        let tool_responses = output["results"][0]["tool_responses"].as_array().unwrap();
        assert_eq!(tool_responses.len(), 1);
        assert!(tool_responses[0]
            .as_str()
            .unwrap()
            .starts_with("Tool current_date returned:"));
        let requests = provider.recorded_requests().await;
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));
    }
}
