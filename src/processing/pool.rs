//! Bounded parallel map over table rows
//!
//! A fixed number of worker tasks pull row indices from a shared cursor. Each
//! row runs in its own spawned task so that an error or a panic is captured
//! as that row's failure; the batch itself never aborts.

use crate::error::{sanitize_error_message, ProcessorResult};
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn, Instrument};

/// What a row's work function receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContext {
    pub row_index: usize,
    pub worker_id: usize,
    pub query: String,
}

/// Result of one row, in input order
#[derive(Debug, Clone)]
pub struct RowOutcome<T> {
    pub row_index: usize,
    pub worker_id: usize,
    pub query: String,
    pub result: Result<T, String>,
    /// Wall-clock seconds spent on the row
    pub elapsed: f64,
}

impl<T> RowOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `work` over every row with at most `max_workers` rows in flight
///
/// Returns exactly one outcome per row, ordered by `row_index`.
pub async fn process_rows_parallel<T, F, Fut>(
    rows: Vec<String>,
    max_workers: usize,
    work: F,
) -> Vec<RowOutcome<T>>
where
    T: Send + 'static,
    F: Fn(RowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProcessorResult<T>> + Send + 'static,
{
    if rows.is_empty() {
        return Vec::new();
    }

    let row_count = rows.len();
    let worker_count = max_workers.clamp(1, row_count);
    let rows = Arc::new(rows);
    let cursor = Arc::new(AtomicUsize::new(0));
    let work = Arc::new(work);

    debug!(row_count, worker_count, "Starting worker pool");

    let mut workers = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let rows = Arc::clone(&rows);
        let cursor = Arc::clone(&cursor);
        let work = Arc::clone(&work);

        workers.push(tokio::spawn(
            async move {
                let mut outcomes = Vec::new();
                loop {
                    let row_index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(query) = rows.get(row_index).cloned() else {
                        break;
                    };
                    let context = RowContext {
                        row_index,
                        worker_id,
                        query,
                    };
                    outcomes.push(run_row(context, Arc::clone(&work)).await);
                }
                outcomes
            }
            .instrument(tracing::debug_span!("worker", worker_id)),
        ));
    }

    let mut slots: Vec<Option<RowOutcome<T>>> = (0..row_count).map(|_| None).collect();
    for worker in workers {
        match worker.await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    let index = outcome.row_index;
                    slots[index] = Some(outcome);
                }
            }
            // Workers never panic themselves; rows are isolated in their own tasks.
            Err(join_error) => warn!(error = %join_error, "Worker task ended abnormally"),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(row_index, slot)| {
            slot.unwrap_or_else(|| RowOutcome {
                row_index,
                worker_id: 0,
                query: rows[row_index].clone(),
                result: Err("Row was not processed".to_string()),
                elapsed: 0.0,
            })
        })
        .collect()
}

async fn run_row<T, F, Fut>(context: RowContext, work: Arc<F>) -> RowOutcome<T>
where
    T: Send + 'static,
    F: Fn(RowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProcessorResult<T>> + Send + 'static,
{
    let row_index = context.row_index;
    let worker_id = context.worker_id;
    let query = context.query.clone();
    let started = Instant::now();

    let result = match tokio::spawn(work(context)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.row_message()),
        Err(join_error) if join_error.is_panic() => Err(sanitize_error_message(&format!(
            "Row processing panicked: {}",
            panic_message(join_error.into_panic())
        ))),
        Err(join_error) => Err(format!("Row task failed: {join_error}")),
    };

    let elapsed = started.elapsed().as_secs_f64();
    if let Err(message) = &result {
        warn!(row_index, worker_id, error = %message, "Row failed");
    } else {
        debug!(row_index, worker_id, elapsed, "Row completed");
    }

    RowOutcome {
        row_index,
        worker_id,
        query,
        result,
        elapsed,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessorError;
    use std::collections::HashSet;
    use std::time::Duration;

    fn rows(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("q{i}")).collect()
    }

    #[tokio::test]
    async fn test_empty_input_yields_nothing() {
        let outcomes =
            process_rows_parallel(Vec::new(), 4, |ctx| async move { Ok(ctx.row_index) }).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order() {
        // Later rows finish first
        let outcomes = process_rows_parallel(rows(6), 6, |ctx| async move {
            tokio::time::sleep(Duration::from_millis(5 * (6 - ctx.row_index as u64))).await;
            Ok(ctx.query.to_uppercase())
        })
        .await;

        let responses: Vec<String> = outcomes
            .iter()
            .map(|o| o.result.clone().unwrap())
            .collect();
        assert_eq!(responses, vec!["Q0", "Q1", "Q2", "Q3", "Q4", "Q5"]);
        assert!(outcomes.iter().enumerate().all(|(i, o)| o.row_index == i));
    }

    #[tokio::test]
    async fn test_errors_are_isolated() {
        let outcomes = process_rows_parallel(rows(4), 2, |ctx| async move {
            if ctx.row_index == 2 {
                Err(ProcessorError::agent_failed("model unavailable"))
            } else {
                Ok(ctx.row_index)
            }
        })
        .await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[2].result, Err("model unavailable".to_string()));
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 3);
    }

    #[tokio::test]
    async fn test_panics_are_isolated() {
        let outcomes = process_rows_parallel(rows(3), 3, |ctx| async move {
            if ctx.row_index == 1 {
                panic!("agent exploded");
            }
            Ok(ctx.row_index)
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result, Ok(0));
        assert_eq!(outcomes[2].result, Ok(2));
        let message = outcomes[1].result.clone().unwrap_err();
        assert!(message.contains("agent exploded"));
    }

    #[tokio::test]
    async fn test_worker_count_is_bounded() {
        let outcomes =
            process_rows_parallel(rows(20), 3, |ctx| async move { Ok(ctx.worker_id) }).await;

        let workers: HashSet<usize> = outcomes.iter().map(|o| o.worker_id).collect();
        assert!(workers.iter().all(|id| *id < 3));
    }

    #[tokio::test]
    async fn test_zero_max_workers_still_processes() {
        let outcomes =
            process_rows_parallel(rows(2), 0, |ctx| async move { Ok(ctx.row_index) }).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.worker_id == 0));
    }
}
