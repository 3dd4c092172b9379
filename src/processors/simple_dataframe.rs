//! Simple DataFrame processor: rows answered one after another

use super::base::{answer_with_agent, apply_template, run_rows};
use super::{unknown_input, ComponentDescriptor, InputDescriptor, OutputDescriptor, Processor};
use crate::agent::{AgentFactory, AgentSpec};
use crate::error::ProcessorResult;
use crate::processing::{ProcessedRow, ProcessorKind, RowAnswer};
use async_trait::async_trait;
use std::sync::Arc;

const COMPONENT: &str = "SimpleDataFrameProcessor";

pub struct SimpleDataFrameProcessor {
    factory: Arc<dyn AgentFactory>,
    pub agent_prompt_template: String,
}

impl SimpleDataFrameProcessor {
    pub fn new(factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            factory,
            agent_prompt_template: String::new(),
        }
    }

    pub fn describe() -> ComponentDescriptor {
        ComponentDescriptor {
            name: COMPONENT,
            display_name: "Simple DataFrame Processor",
            description: "Processes DataFrame rows with agents that call tools to answer queries",
            icon: "table",
            processor_type: ProcessorKind::Simple,
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
impl Processor for SimpleDataFrameProcessor {
    fn descriptor(&self) -> ComponentDescriptor {
        Self::describe()
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Simple
    }

    fn set_input(&mut self, name: &str, value: &str) -> ProcessorResult<()> {
        match name {
            "agent_prompt_template" => self.agent_prompt_template = value.to_string(),
            other => return Err(unknown_input(COMPONENT, other)),
        }
        Ok(())
    }

    async fn process_rows(&self, rows: Vec<String>) -> ProcessorResult<Vec<ProcessedRow>> {
        let factory = Arc::clone(&self.factory);
        let template = self.agent_prompt_template.clone();

        // A single worker keeps rows strictly sequential.
        Ok(run_rows(self.kind(), rows, 1, move |ctx| {
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
