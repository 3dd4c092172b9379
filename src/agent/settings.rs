//! Agent settings

use crate::config::{ProcessorConfig, DEFAULT_SYSTEM_PROMPT};

/// Completion round trips allowed before an agent gives up
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Everything an [`LlmAgent`](super::LlmAgent) needs besides its provider and tools
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub system_prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_iterations: usize,
    /// Append the current UTC date and time to the system prompt
    pub add_current_date: bool,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: None,
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            add_current_date: true,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            system_prompt: config.llm.system_prompt.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_iterations: config.processor.max_tool_iterations,
            add_current_date: config.processor.add_current_date,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn without_current_date(mut self) -> Self {
        self.add_current_date = false;
        self
    }
}
