//! Error types for the parallel agent processors
//!
//! Whole-batch failures surface as `ProcessorError`. Row-level failures never
//! abort a batch; they are flattened into a sanitized message with
//! [`sanitize_error_message`] and stored on the row.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for processor operations
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Agent failed: {message}")]
    AgentFailed { message: String },

    #[error("LLM provider error: {0}")]
    Llm(#[from] crate::llm::provider::LlmError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Tool iteration limit exceeded: {iterations} iterations, max {max}")]
    IterationLimitExceeded { iterations: usize, max: usize },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Tool error: {0}")]
    ToolError(#[from] crate::tools::ToolError),

    #[error("MCP error: {0}")]
    McpError(#[from] crate::mcp::McpError),
}

impl ProcessorError {
    /// Create agent failure error
    pub fn agent_failed<S: Into<String>>(message: S) -> Self {
        Self::AgentFailed {
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create iteration limit error
    pub fn iteration_limit_exceeded(iterations: usize, max: usize) -> Self {
        Self::IterationLimitExceeded { iterations, max }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Message suitable for placing in an output row
    pub fn row_message(&self) -> String {
        let message = match self {
            ProcessorError::AgentFailed { message }
            | ProcessorError::InvalidInput { message }
            | ProcessorError::InternalError { message } => message.clone(),
            other => other.to_string(),
        };
        sanitize_error_message(&message)
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern compiles")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern compiles")
});

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Redact credentials and sensitive paths, and cap the length of an error
/// message before it is written into a result row.
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let mut sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_ERROR_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(truncate_suffix);
    }

    sanitized
}

/// Result type for processor operations
pub type ProcessorResult<T> = Result<T, ProcessorError>;
