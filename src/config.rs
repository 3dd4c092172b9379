//! Configuration system for the parallel agent processors
//!
//! A single TOML file describes the LLM provider every agent talks to, the
//! processor defaults, the optional MCP tool server and the builtin tools.
//! Secrets are never stored in the file; only the names of the environment
//! variables that hold them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Default system prompt handed to every agent
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that can use tools to answer questions and perform tasks.";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorConfig {
    pub llm: LlmSection,
    #[serde(default)]
    pub processor: ProcessorSection,
    /// MCP tool server (optional)
    pub mcp: Option<McpSection>,
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,
}

/// LLM section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("openai" or "gemini")
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    /// System prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max tokens
    pub max_tokens: Option<u32>,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// Processor defaults applied when the host leaves an input empty
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorSection {
    /// Agents consulted per row by the parallel agent processor
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,
    /// Fixed worker count; unset means "derive from row count"
    pub max_workers: Option<usize>,
    /// Maximum LLM round trips per agent call
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    /// Append the current date to each agent's system prompt
    #[serde(default = "default_add_current_date")]
    pub add_current_date: bool,
    /// Prompt template with a `{query}` placeholder
    pub prompt_template: Option<String>,
}

fn default_agent_count() -> usize {
    3
}

fn default_max_tool_iterations() -> usize {
    10
}

fn default_add_current_date() -> bool {
    true
}

impl Default for ProcessorSection {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            max_workers: None,
            max_tool_iterations: default_max_tool_iterations(),
            add_current_date: default_add_current_date(),
            prompt_template: None,
        }
    }
}

/// MCP tool server section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpSection {
    /// Server endpoint, e.g. "http://localhost:8000/mcp"
    pub url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,
    /// Environment variable holding a bearer token
    pub auth_token_env: Option<String>,
    #[serde(default = "default_mcp_enabled")]
    pub enabled: bool,
}

fn default_mcp_timeout() -> u64 {
    30
}

fn default_mcp_enabled() -> bool {
    true
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolConfig {
    /// Simple form: tool_name = "builtin"
    Simple(String),
    /// Complex form: tool_name = { impl = "builtin", config = { ... } }
    Complex {
        #[serde(rename = "impl")]
        implementation: String,
        #[serde(default)]
        config: HashMap<String, serde_json::Value>,
    },
}

impl ToolConfig {
    /// Implementation identifier regardless of form
    pub fn implementation(&self) -> &str {
        match self {
            ToolConfig::Simple(implementation) => implementation,
            ToolConfig::Complex { implementation, .. } => implementation,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProcessorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProcessorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {temperature} is outside 0.0..=2.0"
                )));
            }
        }

        if let Some(base_url) = &self.llm.base_url {
            validate_url("llm.base_url", base_url)?;
        }

        if self.processor.agent_count == 0 {
            return Err(ConfigError::InvalidConfig(
                "processor.agent_count must be at least 1".to_string(),
            ));
        }

        if self.processor.max_workers == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "processor.max_workers must be at least 1".to_string(),
            ));
        }

        if self.processor.max_tool_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "processor.max_tool_iterations must be at least 1".to_string(),
            ));
        }

        if let Some(template) = &self.processor.prompt_template {
            if !template.contains("{query}") {
                return Err(ConfigError::InvalidConfig(
                    "processor.prompt_template must contain a {query} placeholder".to_string(),
                ));
            }
        }

        if let Some(mcp) = &self.mcp {
            validate_url("mcp.url", &mcp.url)?;
        }

        Ok(())
    }

    /// Helper method to get environment variable with error propagation
    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        Self::get_env_var_required(&self.llm.api_key_env)
    }

    /// Get the MCP bearer token, if one is configured and present
    pub fn get_mcp_auth_token(&self) -> Option<String> {
        self.mcp
            .as_ref()
            .and_then(|mcp| mcp.auth_token_env.as_ref())
            .and_then(|name| std::env::var(name).ok())
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
system_prompt = "You are a helpful AI agent."
temperature = 0.2
max_tokens = 1000

[processor]
agent_count = 2
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidConfig(format!("{field} '{value}' is not a URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidConfig(format!(
            "{field} must use http or https, got '{scheme}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[llm]
provider = "gemini"
model = "gemini-2.0-flash-001"
api_key_env = "GOOGLE_API_KEY"
system_prompt = "Explain concepts clearly."
temperature = 0.7
max_tokens = 4000

[processor]
agent_count = 2
max_workers = 6
max_tool_iterations = 5
add_current_date = false
prompt_template = "Answer briefly: {query}"

[mcp]
url = "http://localhost:8000/mcp"
timeout_secs = 10
auth_token_env = "MCP_TOKEN"

[tools]
current_date = "builtin"
"#;

        let config = ProcessorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.temperature, Some(0.7));
        assert_eq!(config.processor.agent_count, 2);
        assert_eq!(config.processor.max_workers, Some(6));
        assert!(!config.processor.add_current_date);
        let mcp = config.mcp.expect("mcp section");
        assert_eq!(mcp.timeout_secs, 10);
        assert!(mcp.enabled);
        assert_eq!(config.tools.len(), 1);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let toml_content = r#"
[llm]
provider = "openai"
model = "gpt-4o"
api_key_env = "OPENAI_API_KEY"
"#;

        let config = ProcessorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.llm.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.processor, ProcessorSection::default());
        assert_eq!(config.processor.agent_count, 3);
        assert_eq!(config.processor.max_tool_iterations, 10);
        assert!(config.processor.add_current_date);
        assert!(config.mcp.is_none());
        assert!(config.tools.is_empty());
    }

    #[test]
    fn test_tool_config_forms() {
        let toml_content = r#"
[llm]
provider = "openai"
model = "gpt-4o"
api_key_env = "OPENAI_API_KEY"

[tools]
current_date = "builtin"
other = { impl = "builtin", config = { timezone = "UTC" } }
"#;

        let config = ProcessorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.tools["current_date"].implementation(), "builtin");
        assert_eq!(config.tools["other"].implementation(), "builtin");
    }

    #[test]
    fn test_rejects_zero_agent_count() {
        let mut config = ProcessorConfig::test_config();
        config.processor.agent_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_max_workers() {
        let mut config = ProcessorConfig::test_config();
        config.processor.max_workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_temperature_out_of_range() {
        let mut config = ProcessorConfig::test_config();
        config.llm.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let mut config = ProcessorConfig::test_config();
        config.processor.prompt_template = Some("no placeholder".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_mcp_url() {
        let mut config = ProcessorConfig::test_config();
        config.mcp = Some(McpSection {
            url: "ftp://example.com/mcp".to_string(),
            timeout_secs: 30,
            auth_token_env: None,
            enabled: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_env_var() {
        let mut config = ProcessorConfig::test_config();
        config.llm.api_key_env = "PARALLEL_AGENTS_TEST_UNSET_KEY".to_string();
        assert!(matches!(
            config.get_llm_api_key(),
            Err(ConfigError::EnvVarNotFound(_))
        ));
    }
}
