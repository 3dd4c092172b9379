//! Batch processing building blocks
//!
//! Every processor runs the same pipeline: extract query strings from the
//! host's table, pick a worker count, map rows through the pool and
//! aggregate the outcomes.

pub mod input;
pub mod pool;
pub mod results;
pub mod workers;

pub use input::{extract_text_values, parse_agent_count, parse_max_workers, DEFAULT_AGENT_COUNT};
pub use pool::{process_rows_parallel, RowContext, RowOutcome};
pub use results::{
    combine_question_answers, combine_results_as_string, create_detailed_results,
    AgentResponseRecord, DetailedResults, ErrorReport, ProcessedRow, ProcessorKind, RowAnswer,
};
pub use workers::{determine_optimal_workers, resolve_worker_count, MAX_WORKERS};
