//! Google Gemini provider (`generateContent` REST API)

use crate::llm::providers::openai::classify_status;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, MessageRole,
    TokenUsage, ToolCall,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini provider configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "Gemini API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// System messages become `systemInstruction`; the rest map onto
    /// Gemini's user/model turns.
    fn build_request(request: &CompletionRequest) -> GenerateRequest {
        let system_text: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        MessageRole::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part::text(&m.content)],
            })
            .collect();

        let tools = request
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| {
                vec![ToolDeclarations {
                    function_declarations: tools
                        .iter()
                        .map(|t| FunctionDeclaration {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                }]
            });

        GenerateRequest {
            contents,
            system_instruction: if system_text.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: vec![Part::text(&system_text.join("\n\n"))],
                })
            },
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
            tools,
        }
    }

    fn parse_response(
        response: GenerateResponse,
        model: &str,
        metadata: HashMap<String, String>,
    ) -> Result<CompletionResponse, LlmError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No candidates returned".to_string()))?;

        let mut text = Vec::new();
        let mut tool_calls = Vec::new();
        for (index, part) in candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
        {
            if let Some(t) = part.text {
                text.push(t);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    id: format!("call_{index}"),
                    name: call.name,
                    arguments: call.args.unwrap_or(Value::Object(Default::default())),
                });
            }
        }

        let usage = response
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let finish_reason = if !tool_calls.is_empty() {
            FinishReason::ToolCalls
        } else {
            match candidate.finish_reason.as_deref() {
                Some("STOP") => FinishReason::Stop,
                Some("MAX_TOKENS") => FinishReason::Length,
                Some("SAFETY") | Some("RECITATION") => FinishReason::ContentFilter,
                _ => FinishReason::Error,
            }
        };

        Ok(CompletionResponse {
            content: if text.is_empty() {
                None
            } else {
                Some(text.join(""))
            },
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            usage,
            finish_reason,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            metadata,
        })
    }

    async fn send(&self, model: &str, body: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.base_url, model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_status("Gemini", status, text))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn available_models(&self) -> Vec<String> {
        vec![
            "gemini-2.0-flash-001".to_string(),
            "gemini-1.5-pro".to_string(),
            "gemini-1.5-flash".to_string(),
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::build_request(&request);
        let backoff_delays = [100u64, 200, 300];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!("Gemini retry attempt {} after {}ms delay", attempt, delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.send(&request.model, &body).await {
                Ok(response) => {
                    return Self::parse_response(response, &request.model, request.metadata)
                }
                Err(e) if e.is_retryable() => {
                    warn!("Gemini request attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::AuthenticationFailed(format!(
                "Gemini health check returned {}",
                response.status()
            )))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclarations>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            function_call: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Message;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                Message::system("Be brief."),
                Message::user("What is AI?"),
                Message::assistant("A field."),
            ],
            model: "gemini-2.0-flash-001".to_string(),
            max_tokens: Some(256),
            temperature: Some(0.3),
            tools: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_provider_requires_api_key() {
        assert!(matches!(
            GeminiProvider::new(GeminiConfig::default()),
            Err(LlmError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_system_messages_become_system_instruction() {
        let body = serde_json::to_value(GeminiProvider::build_request(&request())).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let raw: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello"}, {"text": " there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        }))
        .unwrap();

        let parsed =
            GeminiProvider::parse_response(raw, "gemini-2.0-flash-001", HashMap::new()).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("Hello there"));
        assert_eq!(parsed.finish_reason, FinishReason::Stop);
        assert_eq!(parsed.usage.total_tokens, 6);
        assert_eq!(parsed.model, "gemini-2.0-flash-001");
        assert!(parsed.tool_calls.is_none());
    }

    #[test]
    fn test_parse_function_call_response() {
        let raw: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "current_date", "args": {"timezone": "UTC"}}}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let parsed = GeminiProvider::parse_response(raw, "m", HashMap::new()).unwrap();
        let calls = parsed.tool_calls.expect("tool calls");
        assert_eq!(calls[0].name, "current_date");
        assert_eq!(calls[0].arguments["timezone"], "UTC");
        assert_eq!(parsed.finish_reason, FinishReason::ToolCalls);
    }

    #[test]
    fn test_parse_empty_candidates_is_error() {
        let raw: GenerateResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(
            GeminiProvider::parse_response(raw, "m", HashMap::new()),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
