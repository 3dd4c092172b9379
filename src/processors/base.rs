//! Pipeline shared by every processor

use crate::agent::{AgentFactory, AgentReply, AgentSpec};
use crate::error::ProcessorResult;
use crate::processing::{process_rows_parallel, ProcessedRow, ProcessorKind, RowAnswer, RowContext};
use crate::{batch_span, row_span};
use std::future::Future;
use tracing::{info, Instrument};

/// Worker count used by components whose `max_workers` input defaults to "4"
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Map rows through the pool and turn outcomes into output rows
pub async fn run_rows<F, Fut>(
    kind: ProcessorKind,
    rows: Vec<String>,
    max_workers: usize,
    work: F,
) -> Vec<ProcessedRow>
where
    F: Fn(RowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProcessorResult<RowAnswer>> + Send + 'static,
{
    let span = batch_span!(processor = %kind, rows = rows.len(), max_workers);

    async move {
        info!("Processing batch");

        let processed: Vec<ProcessedRow> = process_rows_parallel(rows, max_workers, move |ctx| {
            let span = row_span!(row_index = ctx.row_index, worker_id = ctx.worker_id);
            work(ctx).instrument(span)
        })
        .await
        .into_iter()
        .map(ProcessedRow::from_outcome)
        .collect();

        let successful = processed.iter().filter(|row| row.success).count();
        info!(
            successful,
            failed = processed.len() - successful,
            "Batch finished"
        );
        processed
    }
    .instrument(span)
    .await
}

/// Build a fresh agent and let it answer `prompt`
pub async fn answer_with_agent(
    factory: &dyn AgentFactory,
    spec: AgentSpec,
    prompt: &str,
) -> ProcessorResult<AgentReply> {
    let agent = factory.create_agent(spec)?;
    agent.respond(prompt).await
}

/// Fill a prompt template's `{query}` placeholder
///
/// An empty template passes the query through; a template without the
/// placeholder gets the query appended.
pub fn apply_template(template: &str, query: &str) -> String {
    if template.trim().is_empty() {
        query.to_string()
    } else if template.contains("{query}") {
        template.replace("{query}", query)
    } else {
        format!("{template}\n\n{query}")
    }
}

impl From<AgentReply> for RowAnswer {
    fn from(reply: AgentReply) -> Self {
        RowAnswer {
            tool_responses: reply.tool_responses,
            ..RowAnswer::new(reply.text, reply.tools_called)
        }
    }
}
