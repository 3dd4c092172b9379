//! Agents answer one query at a time
//!
//! Processors depend only on [`QueryAgent`] and [`AgentFactory`]. The
//! production implementation is [`LlmAgent`], an LLM call loop that may run
//! tools before producing its final text. Every worker asks the factory for
//! a fresh agent, so no agent state is ever shared between rows.

pub mod llm_agent;
pub mod settings;

pub use llm_agent::{LlmAgent, LlmAgentFactory};
pub use settings::AgentSettings;

use crate::error::ProcessorResult;
use crate::llm::provider::TokenUsage;
use crate::tools::ToolSystem;
use async_trait::async_trait;
use std::sync::Arc;

/// Final answer of an agent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    pub text: String,
    /// Tool names in order of first use
    pub tools_called: Vec<String>,
    /// Result text of every tool call, in call order
    pub tool_responses: Vec<String>,
    /// LLM round trips taken
    pub iterations: usize,
    pub usage: TokenUsage,
}

impl AgentReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            iterations: 1,
            ..Default::default()
        }
    }
}

/// Something that can answer a query
#[async_trait]
pub trait QueryAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn respond(&self, query: &str) -> ProcessorResult<AgentReply>;
}

/// Per-agent overrides a processor may request
#[derive(Debug, Clone, Default)]
pub struct AgentSpec {
    pub name: String,
    pub system_prompt: Option<String>,
    /// Replaces the factory's default tool set
    pub tools: Option<Arc<ToolSystem>>,
    /// Added on top of the default (or replaced) tool set, e.g. MCP tools
    pub extra_tools: Option<Arc<ToolSystem>>,
}

impl AgentSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_tools(mut self, tools: Option<Arc<ToolSystem>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_extra_tools(mut self, tools: Option<Arc<ToolSystem>>) -> Self {
        self.extra_tools = tools;
        self
    }
}

/// Builds a fresh agent for every call
pub trait AgentFactory: Send + Sync {
    fn create_agent(&self, spec: AgentSpec) -> ProcessorResult<Box<dyn QueryAgent>>;
}
