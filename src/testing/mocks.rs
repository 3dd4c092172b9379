//! Mock implementations for testing
//!
//! - [`MockLlmProvider`]: scripted completions, records every request
//! - [`MockTool`]: fixed result, counts calls
//! - [`StubAgentFactory`]: scripted agents keyed by query or agent name

use crate::agent::{AgentFactory, AgentReply, AgentSpec, QueryAgent};
use crate::error::{ProcessorError, ProcessorResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One scripted completion
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Error(LlmError),
}

/// Mock LLM provider for testing
///
/// Responses are served in order and wrap around once exhausted.
#[derive(Debug)]
pub struct MockLlmProvider {
    pub responses: Vec<MockResponse>,
    pub current_response: Arc<Mutex<usize>>,
    pub should_fail: bool,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockResponse::Text).collect())
    }

    pub fn scripted(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            current_response: Arc::new(Mutex::new(0)),
            should_fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::scripted(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Requests received so far, oldest first
    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let scripted = if self.responses.is_empty() {
            MockResponse::Text("Mock response".to_string())
        } else {
            self.responses[*current % self.responses.len()].clone()
        };
        *current += 1;

        let (content, tool_calls, finish_reason) = match scripted {
            MockResponse::Text(text) => (Some(text), None, FinishReason::Stop),
            MockResponse::ToolCalls(calls) => (None, Some(calls), FinishReason::ToolCalls),
            MockResponse::Error(error) => return Err(error),
        };

        Ok(CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason,
            tool_calls,
            metadata: HashMap::new(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Tool returning a fixed value
#[derive(Debug)]
pub struct MockTool {
    pub name: String,
    pub result: Value,
    pub should_fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl MockTool {
    pub fn new(name: impl Into<String>, result: Value) -> Self {
        Self {
            name: name.into(),
            result,
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_failure(name: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            ..Self::new(name, Value::Null)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for MockTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: format!("Mock tool {}", self.name),
            parameters: json!({"type": "object"}),
        }
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ToolError::ExecutionError(format!(
                "Mock tool failure: {}",
                self.name
            )));
        }
        Ok(self.result.clone())
    }
}

/// How a stub agent answers
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Answer `Response to: <query>`
    Echo,
    Reply(String),
    ReplyWithTools(String, Vec<String>),
    Fail(String),
    Panic(String),
}

#[derive(Debug, Clone, Default)]
struct StubScript {
    by_query: HashMap<String, StubBehavior>,
    by_agent: HashMap<String, StubBehavior>,
    default: Option<StubBehavior>,
    delay: Option<Duration>,
}

/// Factory of scripted agents
///
/// Agent-name rules take precedence over query rules; anything unscripted
/// echoes the query.
#[derive(Debug, Default)]
pub struct StubAgentFactory {
    script: Arc<StubScript>,
    created: Arc<AtomicUsize>,
    specs: Arc<std::sync::Mutex<Vec<(String, Option<String>)>>>,
}

impl StubAgentFactory {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, behavior: StubBehavior) -> Self {
        self.script_mut().default = Some(behavior);
        self
    }

    pub fn on_query(mut self, query: impl Into<String>, behavior: StubBehavior) -> Self {
        self.script_mut().by_query.insert(query.into(), behavior);
        self
    }

    pub fn on_agent(mut self, agent: impl Into<String>, behavior: StubBehavior) -> Self {
        self.script_mut().by_agent.insert(agent.into(), behavior);
        self
    }

    /// Sleep before every answer, to force interleaving
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script_mut().delay = Some(delay);
        self
    }

    fn script_mut(&mut self) -> &mut StubScript {
        Arc::make_mut(&mut self.script)
    }

    pub fn agents_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// `(agent name, system prompt override)` of every agent built so far
    pub fn created_specs(&self) -> Vec<(String, Option<String>)> {
        self.specs
            .lock()
            .map(|specs| specs.clone())
            .unwrap_or_default()
    }
}

impl AgentFactory for StubAgentFactory {
    fn create_agent(&self, spec: AgentSpec) -> ProcessorResult<Box<dyn QueryAgent>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut specs) = self.specs.lock() {
            specs.push((spec.name.clone(), spec.system_prompt.clone()));
        }

        Ok(Box::new(StubAgent {
            name: spec.name,
            script: Arc::clone(&self.script),
        }))
    }
}

/// Agent produced by [`StubAgentFactory`]
#[derive(Debug)]
pub struct StubAgent {
    name: String,
    script: Arc<StubScript>,
}

#[async_trait]
impl QueryAgent for StubAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, query: &str) -> ProcessorResult<AgentReply> {
        if let Some(delay) = self.script.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self
            .script
            .by_agent
            .get(&self.name)
            .or_else(|| self.script.by_query.get(query))
            .or(self.script.default.as_ref())
            .cloned()
            .unwrap_or(StubBehavior::Echo);

        match behavior {
            StubBehavior::Echo => Ok(AgentReply::text(format!("Response to: {query}"))),
            StubBehavior::Reply(text) => Ok(AgentReply::text(text)),
            StubBehavior::ReplyWithTools(text, tools) => Ok(AgentReply {
                tools_called: tools,
                ..AgentReply::text(text)
            }),
            StubBehavior::Fail(message) => Err(ProcessorError::agent_failed(message)),
            StubBehavior::Panic(message) => panic!("{message}"),
        }
    }
}
