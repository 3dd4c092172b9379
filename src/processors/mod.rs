//! Host-facing processor components
//!
//! A host discovers a component through its [`ComponentDescriptor`], assigns
//! string inputs with [`Processor::set_input`] and asks for one of the
//! declared outputs. Agents, LLM providers and tools are injected through an
//! [`AgentFactory`](crate::agent::AgentFactory) instead of being created by
//! the component itself.

pub mod base;
pub mod catalog;
pub mod integrated;
pub mod parallel_agent;
pub mod parallel_dataframe;
pub mod parallel_query;
pub mod simple_dataframe;

pub use catalog::{component_catalog, create_processor};
pub use integrated::IntegratedParallelProcessor;
pub use parallel_agent::ParallelAgentProcessor;
pub use parallel_dataframe::ParallelDataFrameProcessor;
pub use parallel_query::ParallelQueryProcessor;
pub use simple_dataframe::SimpleDataFrameProcessor;

use crate::error::{ProcessorError, ProcessorResult};
use crate::processing::results::DEFAULT_SEPARATOR;
use crate::processing::{
    combine_results_as_string, create_detailed_results, extract_text_values, DetailedResults,
    ErrorReport, ProcessedRow, ProcessorKind,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::error;

/// How the host renders an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Str,
    Handle,
}

/// A declared component input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub info: &'static str,
    pub kind: InputKind,
    pub advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_types: Vec<&'static str>,
}

impl InputDescriptor {
    pub fn text(name: &'static str, display_name: &'static str, info: &'static str) -> Self {
        Self {
            name,
            display_name,
            info,
            kind: InputKind::Str,
            advanced: false,
            value: None,
            input_types: Vec::new(),
        }
    }

    pub fn handle(
        name: &'static str,
        display_name: &'static str,
        info: &'static str,
        input_types: Vec<&'static str>,
    ) -> Self {
        Self {
            kind: InputKind::Handle,
            input_types,
            ..Self::text(name, display_name, info)
        }
    }

    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    pub fn with_value(mut self, value: &'static str) -> Self {
        self.value = Some(value);
        self
    }
}

/// Shape of an output value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// A single string
    Text,
    /// A [`DetailedOutput`] table
    Data,
}

/// A declared component output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub method: &'static str,
    pub kind: OutputKind,
}

impl OutputDescriptor {
    pub fn text(name: &'static str, display_name: &'static str, method: &'static str) -> Self {
        Self {
            name,
            display_name,
            method,
            kind: OutputKind::Text,
        }
    }

    pub fn detailed_results() -> Self {
        Self {
            name: "detailed_results",
            display_name: "Detailed Results",
            method: "build_detailed_results",
            kind: OutputKind::Data,
        }
    }
}

/// Everything a host needs to list and wire a component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub processor_type: ProcessorKind,
    pub inputs: Vec<InputDescriptor>,
    pub outputs: Vec<OutputDescriptor>,
}

impl ComponentDescriptor {
    pub fn output(&self, name: &str) -> Option<&OutputDescriptor> {
        self.outputs.iter().find(|output| output.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&InputDescriptor> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// Detailed output: statistics on success, an error report otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetailedOutput {
    Data(DetailedResults),
    Error(ErrorReport),
}

impl DetailedOutput {
    pub fn is_error(&self) -> bool {
        matches!(self, DetailedOutput::Error(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Value produced for one declared output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComponentOutput {
    Text(String),
    Data(DetailedOutput),
}

/// Explicit component interface
#[async_trait]
pub trait Processor: Send + Sync {
    fn descriptor(&self) -> ComponentDescriptor;

    fn kind(&self) -> ProcessorKind;

    /// Assign a string input by its declared name
    fn set_input(&mut self, name: &str, value: &str) -> ProcessorResult<()>;

    /// Answer every row; whole-batch problems are errors, row problems are not
    async fn process_rows(&self, rows: Vec<String>) -> ProcessorResult<Vec<ProcessedRow>>;

    fn combine(&self, rows: &[ProcessedRow]) -> String {
        combine_results_as_string(rows, DEFAULT_SEPARATOR)
    }

    /// Prefix of the string output when the whole batch fails
    fn batch_error_context(&self) -> &'static str {
        "Error processing DataFrame"
    }

    fn additional_stats(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    async fn build_processed_results(&self, input: &Value) -> String {
        match self.process_rows(extract_text_values(input)).await {
            Ok(rows) => self.combine(&rows),
            Err(e) => {
                error!(processor = %self.kind(), error = %e, "Batch failed");
                format!("{}: {}", self.batch_error_context(), e.row_message())
            }
        }
    }

    async fn build_detailed_results(&self, input: &Value) -> DetailedOutput {
        match self.process_rows(extract_text_values(input)).await {
            Ok(rows) => DetailedOutput::Data(create_detailed_results(
                rows,
                self.kind(),
                Some(self.additional_stats()),
            )),
            Err(e) => {
                error!(processor = %self.kind(), error = %e, "Batch failed");
                DetailedOutput::Error(ErrorReport::new(e.row_message()))
            }
        }
    }

    /// Produce the output declared under `output`
    async fn build_output(&self, output: &str, input: &Value) -> ProcessorResult<ComponentOutput> {
        let descriptor = self.descriptor();
        let declared = descriptor.output(output).ok_or_else(|| {
            ProcessorError::invalid_input(format!(
                "{} has no output named '{output}'",
                descriptor.name
            ))
        })?;

        Ok(match declared.kind {
            OutputKind::Text => ComponentOutput::Text(self.build_processed_results(input).await),
            OutputKind::Data => ComponentOutput::Data(self.build_detailed_results(input).await),
        })
    }
}

/// Error for an input name the component does not declare
pub(crate) fn unknown_input(component: &str, name: &str) -> ProcessorError {
    ProcessorError::invalid_input(format!("{component} has no input named '{name}'"))
}
