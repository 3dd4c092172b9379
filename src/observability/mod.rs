//! Observability for the parallel processors
//!
//! Structured logging through `tracing`, with span macros for the batch,
//! row, agent and tool levels of a run.

pub mod logging;

pub use logging::{init_default_logging, init_logging, parse_level, LogFormat};

// Span macros for structured logging
pub use logging::{agent_span, batch_span, row_span, tool_span};
