//! LLM provider implementations
//!
//! Concrete [`LlmProvider`] backends plus the factory that picks one from
//! the `[llm]` configuration section.

pub mod gemini;
pub mod openai;

pub use gemini::*;
pub use openai::*;

use crate::config::LlmSection;
use crate::llm::provider::{LlmError, LlmProvider};
use std::sync::Arc;

/// Build the provider named in configuration with an already-resolved key
pub fn create_provider(llm: &LlmSection, api_key: String) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match llm.provider.as_str() {
        "openai" => {
            let mut config = OpenAiConfig {
                api_key,
                ..Default::default()
            };
            if let Some(base_url) = &llm.base_url {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
            Ok(Arc::new(OpenAiProvider::new(config)?))
        }
        "gemini" | "google" => {
            let mut config = GeminiConfig {
                api_key,
                ..Default::default()
            };
            if let Some(base_url) = &llm.base_url {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
            Ok(Arc::new(GeminiProvider::new(config)?))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unsupported LLM provider: {other}"
        ))),
    }
}
