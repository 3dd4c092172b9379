//! LLM-backed agent
//!
//! The loop: send the conversation, run any tools the model asks for, feed
//! their results back as a user message, repeat until the model answers
//! without tool calls or the iteration limit is hit.

use super::{AgentFactory, AgentReply, AgentSettings, AgentSpec, QueryAgent};
use crate::error::{ProcessorError, ProcessorResult};
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider, Message, ToolCall};
use crate::tools::{ToolDescription, ToolSystem};
use crate::{agent_span, tool_span};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Agent that answers through an [`LlmProvider`], optionally calling tools
pub struct LlmAgent {
    name: String,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolSystem>,
    settings: AgentSettings,
}

impl LlmAgent {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolSystem>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn build_initial_messages(&self, query: &str) -> Vec<Message> {
        let system_prompt = if self.settings.add_current_date {
            format!(
                "{}\n\nCurrent date and time: {} UTC",
                self.settings.system_prompt,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
            )
        } else {
            self.settings.system_prompt.clone()
        };

        vec![Message::system(system_prompt), Message::user(query)]
    }

    fn create_completion_request(
        &self,
        messages: Vec<Message>,
        available_tools: &[ToolDescription],
    ) -> CompletionRequest {
        let mut metadata = HashMap::new();
        metadata.insert("agent".to_string(), self.name.clone());

        CompletionRequest {
            messages,
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools: if available_tools.is_empty() {
                None
            } else {
                Some(available_tools.to_vec())
            },
            metadata,
        }
    }

    /// Run every requested tool; failures are reported to the model, not raised
    async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<String> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let span = tool_span!(tool = %call.name, agent = %self.name);
            let result = self
                .tools
                .execute_tool(&call.name, &call.arguments)
                .instrument(span)
                .await;

            results.push(match result {
                Ok(value) => {
                    debug!(tool = %call.name, "Tool completed");
                    format!("Tool {} returned: {}", call.name, value)
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool failed");
                    format!("Tool {} failed: {}", call.name, e)
                }
            });
        }

        results
    }

    fn add_assistant_response(messages: &mut Vec<Message>, response: &CompletionResponse) {
        if let Some(content) = &response.content {
            if !content.is_empty() {
                messages.push(Message::assistant(content.clone()));
            }
        }
    }

    fn add_tool_results(messages: &mut Vec<Message>, tool_results: &[String]) {
        if !tool_results.is_empty() {
            messages.push(Message::user(format!(
                "Tool results:\n{}",
                tool_results.join("\n")
            )));
        }
    }

    async fn run_loop(&self, query: &str) -> ProcessorResult<AgentReply> {
        let available_tools = self.tools.describe_all();
        let mut messages = self.build_initial_messages(query);
        let mut reply = AgentReply::default();

        loop {
            if reply.iterations >= self.settings.max_iterations {
                return Err(ProcessorError::iteration_limit_exceeded(
                    reply.iterations + 1,
                    self.settings.max_iterations,
                ));
            }
            reply.iterations += 1;

            let request = self.create_completion_request(messages.clone(), &available_tools);
            let response = self.provider.complete(request).await?;
            reply.usage.add(&response.usage);

            Self::add_assistant_response(&mut messages, &response);

            match response.tool_calls.as_deref() {
                Some(tool_calls) if !tool_calls.is_empty() => {
                    debug!(
                        iteration = reply.iterations,
                        tool_count = tool_calls.len(),
                        "Processing tool calls"
                    );
                    for call in tool_calls {
                        if !reply.tools_called.contains(&call.name) {
                            reply.tools_called.push(call.name.clone());
                        }
                    }
                    let tool_results = self.execute_tool_calls(tool_calls).await;
                    Self::add_tool_results(&mut messages, &tool_results);
                    reply.tool_responses.extend(tool_results);
                }
                _ => {
                    reply.text = response.content.unwrap_or_default();
                    info!(
                        iterations = reply.iterations,
                        tokens = reply.usage.total_tokens,
                        "Agent produced final answer"
                    );
                    return Ok(reply);
                }
            }
        }
    }
}

#[async_trait]
impl QueryAgent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, query: &str) -> ProcessorResult<AgentReply> {
        let span = agent_span!(agent = %self.name, provider = %self.provider.name());
        self.run_loop(query).instrument(span).await
    }
}

/// Production [`AgentFactory`]: every agent shares the provider and default tools
#[derive(Clone)]
pub struct LlmAgentFactory {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolSystem>,
    settings: AgentSettings,
}

impl LlmAgentFactory {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolSystem>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn tools(&self) -> &Arc<ToolSystem> {
        &self.tools
    }
}

impl AgentFactory for LlmAgentFactory {
    fn create_agent(&self, spec: AgentSpec) -> ProcessorResult<Box<dyn QueryAgent>> {
        let mut settings = self.settings.clone();
        if let Some(prompt) = spec.system_prompt.filter(|p| !p.trim().is_empty()) {
            settings.system_prompt = prompt;
        }
        let mut tools = spec.tools.unwrap_or_else(|| Arc::clone(&self.tools));
        if let Some(extra) = spec.extra_tools.filter(|extra| !extra.is_empty()) {
            let mut merged = (*tools).clone();
            merged.extend(&extra);
            tools = Arc::new(merged);
        }

        Ok(Box::new(LlmAgent::new(
            spec.name,
            Arc::clone(&self.provider),
            tools,
            settings,
        )))
    }
}
