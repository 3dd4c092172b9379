//! Parallel agent processor
//!
//! Every row is answered by several freshly built agents; rows run
//! concurrently on a pool sized from the row count.

use super::base::{answer_with_agent, run_rows};
use super::{unknown_input, ComponentDescriptor, InputDescriptor, OutputDescriptor, Processor};
use crate::agent::{AgentFactory, AgentSpec};
use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::error::{ProcessorError, ProcessorResult};
use crate::processing::{
    parse_agent_count, resolve_worker_count, AgentResponseRecord, ProcessedRow, ProcessorKind,
    RowAnswer,
};
use crate::tools::ToolSystem;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

const COMPONENT: &str = "ParallelAgentProcessor";

/// Separator between the answers of the agents of one row
pub const AGENT_RESPONSE_SEPARATOR: &str = "\n\n";

pub struct ParallelAgentProcessor {
    factory: Arc<dyn AgentFactory>,
    /// Agents per row (default "3")
    pub agent_count: String,
    /// Pool size; empty derives it from the row count
    pub max_workers: String,
    pub system_prompt: String,
    /// Tools from an MCP server, added to every agent
    pub mcp_server: Option<Arc<ToolSystem>>,
}

impl ParallelAgentProcessor {
    pub fn new(factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            factory,
            agent_count: "3".to_string(),
            max_workers: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            mcp_server: None,
        }
    }

    pub fn with_mcp_server(mut self, tools: Arc<ToolSystem>) -> Self {
        self.mcp_server = Some(tools);
        self
    }

    pub fn describe() -> ComponentDescriptor {
        ComponentDescriptor {
            name: COMPONENT,
            display_name: "Parallel Agent Processor",
            description: "Processes DataFrame rows in parallel using multiple agents that can call \
                          MCP server tools. Number of workers based on DataFrame size.",
            icon: "users",
            processor_type: ProcessorKind::ParallelAgents,
            inputs: vec![
                InputDescriptor::text(
                    "dataframe_input",
                    "DataFrame Input",
                    "Input DataFrame with a 'text' column to process",
                ),
                InputDescriptor::text(
                    "agent_count",
                    "Agent Count",
                    "Number of agents to use for processing each query (default: 3)",
                )
                .advanced()
                .with_value("3"),
                InputDescriptor::text(
                    "max_workers",
                    "Max Workers",
                    "Maximum number of parallel workers (default: based on DataFrame size, max 10)",
                )
                .advanced()
                .with_value(""),
                InputDescriptor::text(
                    "system_prompt",
                    "Agent System Prompt",
                    "System prompt for the agents that process queries",
                )
                .advanced()
                .with_value(DEFAULT_SYSTEM_PROMPT),
                InputDescriptor::handle(
                    "mcp_server",
                    "MCP Server",
                    "MCP server to connect to for tools",
                    vec!["MCPTools"],
                )
                .advanced(),
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

    fn agent_count(&self) -> usize {
        parse_agent_count(Some(&self.agent_count))
    }
}

/// Ask `agent_count` agents in turn; any failure fails the row
async fn answer_with_agents(
    factory: Arc<dyn AgentFactory>,
    agent_count: usize,
    system_prompt: String,
    mcp_tools: Option<Arc<ToolSystem>>,
    query: String,
) -> ProcessorResult<RowAnswer> {
    let mut answer = RowAnswer::default();
    let mut texts = Vec::with_capacity(agent_count);
    let mut total_time = 0.0;

    for index in 1..=agent_count {
        let name = format!("Agent_{index}");
        let spec = AgentSpec::named(name.clone())
            .with_system_prompt(Some(system_prompt.clone()))
            .with_extra_tools(mcp_tools.clone());

        let started = Instant::now();
        let result = answer_with_agent(factory.as_ref(), spec, &query).await;
        let elapsed = started.elapsed().as_secs_f64();
        answer.agents_called.push(name.clone());

        match result {
            Ok(reply) => {
                total_time += elapsed;
                for tool in &reply.tools_called {
                    if !answer.tools_called.contains(tool) {
                        answer.tools_called.push(tool.clone());
                    }
                }
                answer.tool_responses.extend(reply.tool_responses);
                texts.push(reply.text.clone());
                answer.agent_responses.push(AgentResponseRecord {
                    agent: name,
                    response: reply.text,
                    tools_called: reply.tools_called,
                    processing_time: elapsed,
                });
            }
            Err(e) => {
                warn!(agent = %name, error = %e, "Agent failed");
                if answer.error.is_none() {
                    answer.error = Some(format!("{name}: {}", e.row_message()));
                }
            }
        }
    }

    answer.response = texts.join(AGENT_RESPONSE_SEPARATOR);
    answer.processing_time = Some(total_time);
    Ok(answer)
}

#[async_trait]
impl Processor for ParallelAgentProcessor {
    fn descriptor(&self) -> ComponentDescriptor {
        Self::describe()
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::ParallelAgents
    }

    fn set_input(&mut self, name: &str, value: &str) -> ProcessorResult<()> {
        match name {
            "agent_count" => self.agent_count = value.to_string(),
            "max_workers" => self.max_workers = value.to_string(),
            "system_prompt" => self.system_prompt = value.to_string(),
            "mcp_server" => {
                return Err(ProcessorError::invalid_input(
                    "mcp_server is a handle input; attach tools with with_mcp_server",
                ))
            }
            other => return Err(unknown_input(COMPONENT, other)),
        }
        Ok(())
    }

    async fn process_rows(&self, rows: Vec<String>) -> ProcessorResult<Vec<ProcessedRow>> {
        let max_workers = resolve_worker_count(Some(&self.max_workers), rows.len());
        let agent_count = self.agent_count();
        let factory = Arc::clone(&self.factory);
        let system_prompt = self.system_prompt.clone();
        let mcp_tools = self.mcp_server.clone();

        Ok(run_rows(self.kind(), rows, max_workers, move |ctx| {
            answer_with_agents(
                Arc::clone(&factory),
                agent_count,
                system_prompt.clone(),
                mcp_tools.clone(),
                ctx.query,
            )
        })
        .await)
    }

    fn additional_stats(&self) -> BTreeMap<String, Value> {
        let mut stats = BTreeMap::new();
        stats.insert("agent_count".to_string(), json!(self.agent_count()));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{StubAgentFactory, StubBehavior};

    #[tokio::test]
    async fn test_each_row_uses_agent_count_agents() {
        let factory = Arc::new(StubAgentFactory::echo());
        let mut processor = ParallelAgentProcessor::new(factory.clone());
        processor.set_input("agent_count", "2").unwrap();

        let rows = processor
            .process_rows(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(factory.agents_created(), 4);
        assert_eq!(rows[0].agents_called, vec!["Agent_1", "Agent_2"]);
        assert_eq!(rows[0].response, "Response to: a\n\nResponse to: a");
        assert_eq!(rows[1].agent_responses.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_agent_count_falls_back_to_three() {
        let factory = Arc::new(StubAgentFactory::echo());
        let mut processor = ParallelAgentProcessor::new(factory.clone());
        processor.set_input("agent_count", "many").unwrap();

        processor.process_rows(vec!["q".to_string()]).await.unwrap();
        assert_eq!(factory.agents_created(), 3);
    }

    #[tokio::test]
    async fn test_tools_are_deduplicated() {
        let factory = Arc::new(StubAgentFactory::echo().with_default(StubBehavior::ReplyWithTools(
            "done".to_string(),
            vec!["search".to_string(), "current_date".to_string()],
        )));
        let processor = ParallelAgentProcessor::new(factory);

        let rows = processor.process_rows(vec!["q".to_string()]).await.unwrap();
        assert_eq!(rows[0].tools_called, vec!["search", "current_date"]);
    }

    #[tokio::test]
    async fn test_one_failing_agent_fails_the_row() {
        let factory = Arc::new(
            StubAgentFactory::echo().on_agent("Agent_2", StubBehavior::Fail("quota".to_string())),
        );
        let processor = ParallelAgentProcessor::new(factory);

        let rows = processor.process_rows(vec!["q".to_string()]).await.unwrap();
        let row = &rows[0];
        assert!(!row.success);
        assert_eq!(row.error.as_deref(), Some("Agent_2: quota"));
        assert_eq!(row.response, "Error processing query: Agent_2: quota");
        assert_eq!(row.agents_called.len(), 3);
        assert_eq!(row.agent_responses.len(), 2);
    }

    #[tokio::test]
    async fn test_system_prompt_reaches_every_agent() {
        let factory = Arc::new(StubAgentFactory::echo());
        let mut processor = ParallelAgentProcessor::new(factory.clone());
        processor.set_input("system_prompt", "Be terse.").unwrap();
        processor.set_input("agent_count", "2").unwrap();

        processor.process_rows(vec!["q".to_string()]).await.unwrap();
        let specs = factory.created_specs();
        assert_eq!(specs.len(), 2);
        assert!(specs
            .iter()
            .all(|(_, prompt)| prompt.as_deref() == Some("Be terse.")));
    }

    #[test]
    fn test_unknown_input_is_rejected() {
        let mut processor = ParallelAgentProcessor::new(Arc::new(StubAgentFactory::echo()));
        assert!(processor.set_input("temperature", "0.1").is_err());
        assert!(processor.set_input("mcp_server", "x").is_err());
    }

    #[tokio::test]
    async fn test_detailed_results_include_agent_count() {
        let processor = ParallelAgentProcessor::new(Arc::new(StubAgentFactory::echo()));
        let output = processor
            .build_detailed_results(&json!({"text": ["a", "b"]}))
            .await
            .to_value();

        assert_eq!(output["processor_type"], "parallel_agents");
        assert_eq!(output["agent_count"], 3);
        assert_eq!(output["total_processed"], 2);
        assert_eq!(output["successful"], 2);
    }
}
