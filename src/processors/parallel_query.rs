//! Parallel query processor: one agent per row, Q/A formatted output

use super::base::{answer_with_agent, run_rows, DEFAULT_MAX_WORKERS};
use super::{unknown_input, ComponentDescriptor, InputDescriptor, OutputDescriptor, Processor};
use crate::agent::{AgentFactory, AgentSpec};
use crate::error::ProcessorResult;
use crate::processing::results::DEFAULT_SEPARATOR;
use crate::processing::{
    combine_question_answers, parse_max_workers, ProcessedRow, ProcessorKind, RowAnswer,
};
use async_trait::async_trait;
use std::sync::Arc;

const COMPONENT: &str = "ParallelQueryProcessor";

pub struct ParallelQueryProcessor {
    factory: Arc<dyn AgentFactory>,
    pub max_workers: String,
}

impl ParallelQueryProcessor {
    pub fn new(factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            factory,
            max_workers: DEFAULT_MAX_WORKERS.to_string(),
        }
    }

    pub fn describe() -> ComponentDescriptor {
        ComponentDescriptor {
            name: COMPONENT,
            display_name: "Parallel Query Processor",
            description: "Processes DataFrame rows in parallel, with each row processed by an agent \
                          to answer queries",
            icon: "activity",
            processor_type: ProcessorKind::Query,
            inputs: vec![
                InputDescriptor::text(
                    "dataframe_input",
                    "DataFrame Input",
                    "Input DataFrame with a 'text' column containing queries",
                ),
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
                    "combined_results",
                    "Combined Results",
                    "build_combined_results",
                ),
                OutputDescriptor::detailed_results(),
            ],
        }
    }
}

#[async_trait]
impl Processor for ParallelQueryProcessor {
    fn descriptor(&self) -> ComponentDescriptor {
        Self::describe()
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Query
    }

    fn set_input(&mut self, name: &str, value: &str) -> ProcessorResult<()> {
        match name {
            "max_workers" => self.max_workers = value.to_string(),
            other => return Err(unknown_input(COMPONENT, other)),
        }
        Ok(())
    }

    async fn process_rows(&self, rows: Vec<String>) -> ProcessorResult<Vec<ProcessedRow>> {
        let max_workers = parse_max_workers(Some(&self.max_workers), DEFAULT_MAX_WORKERS);
        let factory = Arc::clone(&self.factory);

        Ok(run_rows(self.kind(), rows, max_workers, move |ctx| {
            let factory = Arc::clone(&factory);
            async move {
                let spec = AgentSpec::named(format!("query_{}", ctx.row_index));
                let reply = answer_with_agent(factory.as_ref(), spec, &ctx.query).await?;
                Ok(RowAnswer::from(reply))
            }
        })
        .await)
    }

    fn combine(&self, rows: &[ProcessedRow]) -> String {
        combine_question_answers(rows, DEFAULT_SEPARATOR)
    }

    fn batch_error_context(&self) -> &'static str {
        "Error processing queries"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::ComponentOutput;
    use crate::testing::mocks::{StubAgentFactory, StubBehavior};
    use serde_json::json;

    #[tokio::test]
    async fn test_combined_results_in_question_answer_form() {
        let factory = StubAgentFactory::echo()
            .on_query("2+2?", StubBehavior::Reply("4".to_string()))
            .on_query("Capital of Peru?", StubBehavior::Reply("Lima".to_string()));
        let processor = ParallelQueryProcessor::new(Arc::new(factory));

        let output = processor
            .build_output("combined_results", &json!({"text": ["2+2?", "Capital of Peru?"]}))
            .await
            .unwrap();
        assert_eq!(
            output,
            ComponentOutput::Text("Q: 2+2?\nA: 4\nQ: Capital of Peru?\nA: Lima".to_string())
        );
    }

    #[tokio::test]
    async fn test_detailed_results_count_queries() {
        let processor = ParallelQueryProcessor::new(Arc::new(StubAgentFactory::echo()));
        let output = processor
            .build_detailed_results(&json!(["a", "b"]))
            .await
            .to_value();

        assert_eq!(output["processor_type"], "query");
        assert_eq!(output["total_queries"], 2);
        assert!(output.get("tool_usage").is_none());
    }

    #[tokio::test]
    async fn test_unknown_output_is_rejected() {
        let processor = ParallelQueryProcessor::new(Arc::new(StubAgentFactory::echo()));
        let result = processor.build_output("processed_results", &json!([])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_string() {
        let processor = ParallelQueryProcessor::new(Arc::new(StubAgentFactory::echo()));
        assert_eq!(processor.build_processed_results(&json!([])).await, "");
    }
}
