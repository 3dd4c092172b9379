//! LLM provider abstraction layer
//!
//! Provider-agnostic interface for the completions every agent makes, with
//! OpenAI-compatible and Gemini backends.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
