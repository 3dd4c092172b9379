//! Parallel Agents - processor components for LLM agents over tables
//!
//! Each component takes a table of text queries, fans the rows out to
//! freshly built agents on a bounded worker pool and aggregates the
//! answers into a combined string or a detailed statistics table.
//!
//! # Overview
//!
//! - [`processing`]: input extraction, worker sizing, the row pool and
//!   result aggregation
//! - [`processors`]: the host-facing components and their descriptors
//! - [`agent`]: the LLM tool loop behind every answer
//! - [`llm`], [`tools`], [`mcp`]: providers, the tool registry and the MCP
//!   tool server client
//!
//! # Quick Start
//!
//! ```rust
//! use parallel_agents::processors::{ParallelQueryProcessor, Processor};
//! use parallel_agents::testing::mocks::StubAgentFactory;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let processor = ParallelQueryProcessor::new(Arc::new(StubAgentFactory::echo()));
//! let table = json!({"data": [{"text": "What is Rust?"}]});
//!
//! let combined = processor.build_processed_results(&table).await;
//! assert_eq!(combined, "Q: What is Rust?\nA: Response to: What is Rust?");
//! # });
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod observability;
pub mod processing;
pub mod processors;
pub mod testing;
pub mod tools;

pub use agent::{AgentFactory, AgentReply, AgentSpec, LlmAgentFactory, QueryAgent};
pub use config::*;
pub use error::{ProcessorError, ProcessorResult};
pub use processing::{DetailedResults, ProcessedRow, ProcessorKind};
pub use processors::{component_catalog, create_processor, DetailedOutput, Processor};
pub use tools::{Tool, ToolDescription, ToolError, ToolSystem};
