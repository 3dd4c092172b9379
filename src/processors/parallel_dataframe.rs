//! Parallel DataFrame processor: one templated prompt per row

use super::base::{answer_with_agent, apply_template, run_rows, DEFAULT_MAX_WORKERS};
use super::{unknown_input, ComponentDescriptor, InputDescriptor, OutputDescriptor, Processor};
use crate::agent::{AgentFactory, AgentSpec};
use crate::error::ProcessorResult;
use crate::processing::{parse_max_workers, ProcessedRow, ProcessorKind, RowAnswer};
use async_trait::async_trait;
use std::sync::Arc;

const COMPONENT: &str = "ParallelDataFrameProcessor";

pub struct ParallelDataFrameProcessor {
    factory: Arc<dyn AgentFactory>,
    /// Prompt with a `{query}` placeholder
    pub agent_prompt_template: String,
    pub max_workers: String,
}

impl ParallelDataFrameProcessor {
    pub fn new(factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            factory,
            agent_prompt_template: String::new(),
            max_workers: DEFAULT_MAX_WORKERS.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.agent_prompt_template = template.into();
        self
    }

    pub fn describe() -> ComponentDescriptor {
        ComponentDescriptor {
            name: COMPONENT,
            display_name: "Parallel DataFrame Processor",
            description: "Processes DataFrame rows in parallel, with each row processed by an agent \
                          that calls tools to answer queries",
            icon: "parallel",
            processor_type: ProcessorKind::Parallel,
            inputs: vec![
                InputDescriptor::text(
                    "dataframe_input",
                    "DataFrame Input",
                    "Input DataFrame with a 'text' column to process",
                ),
                InputDescriptor::text(
                    "agent_prompt_template",
                    "Agent Prompt Template",
                    "Template for the agent prompt, with {query} placeholder for each text value",
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
}

#[async_trait]
impl Processor for ParallelDataFrameProcessor {
    fn descriptor(&self) -> ComponentDescriptor {
        Self::describe()
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Parallel
    }

    fn set_input(&mut self, name: &str, value: &str) -> ProcessorResult<()> {
        match name {
            "agent_prompt_template" => self.agent_prompt_template = value.to_string(),
            "max_workers" => self.max_workers = value.to_string(),
            other => return Err(unknown_input(COMPONENT, other)),
        }
        Ok(())
    }

    async fn process_rows(&self, rows: Vec<String>) -> ProcessorResult<Vec<ProcessedRow>> {
        let max_workers = parse_max_workers(Some(&self.max_workers), DEFAULT_MAX_WORKERS);
        let factory = Arc::clone(&self.factory);
        let template = self.agent_prompt_template.clone();

        Ok(run_rows(self.kind(), rows, max_workers, move |ctx| {
            let factory = Arc::clone(&factory);
            let prompt = apply_template(&template, &ctx.query);
            async move {
                let spec = AgentSpec::named(format!("row_{}", ctx.row_index));
                let reply = answer_with_agent(factory.as_ref(), spec, &prompt).await?;
                Ok(RowAnswer::from(reply))
            }
        })
        .await)
    }
}
