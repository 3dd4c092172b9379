//! Property tests for worker sizing, input extraction and the row pool

use parallel_agents::error::ProcessorError;
use parallel_agents::processing::{
    determine_optimal_workers, extract_text_values, process_rows_parallel, MAX_WORKERS,
};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn prop_worker_count_is_bounded(record_count in 0usize..10_000) {
        let workers = determine_optimal_workers(record_count);
        prop_assert!(workers >= 1);
        prop_assert!(workers <= MAX_WORKERS);
        if (1..=4).contains(&record_count) {
            prop_assert_eq!(workers, record_count);
        }
    }

    #[test]
    fn prop_worker_count_never_decreases(record_count in 0usize..10_000) {
        prop_assert!(
            determine_optimal_workers(record_count) <= determine_optimal_workers(record_count + 1)
        );
    }

    #[test]
    fn prop_text_column_keeps_every_row(texts in prop::collection::vec(".*", 0..20)) {
        let extracted = extract_text_values(&json!({"text": texts.clone()}));
        prop_assert_eq!(extracted, texts);
    }

    #[test]
    fn prop_pool_returns_one_outcome_per_row_in_order(
        queries in prop::collection::vec("[a-z]{1,8}", 0..40),
        max_workers in 0usize..16,
        failing in prop::collection::vec(any::<bool>(), 40),
    ) {
        let expected_failures: Vec<bool> = failing.iter().copied().take(queries.len()).collect();
        let outcomes = tokio_test::block_on(process_rows_parallel(
            queries.clone(),
            max_workers,
            move |ctx| {
                let fail = failing[ctx.row_index];
                async move {
                    if fail {
                        Err(ProcessorError::agent_failed(format!("row {} failed", ctx.row_index)))
                    } else {
                        Ok(ctx.query.len())
                    }
                }
            },
        ));

        prop_assert_eq!(outcomes.len(), queries.len());
        let worker_limit = max_workers.max(1);
        for (index, outcome) in outcomes.iter().enumerate() {
            prop_assert_eq!(outcome.row_index, index);
            prop_assert_eq!(&outcome.query, &queries[index]);
            prop_assert!(outcome.worker_id < worker_limit);
            prop_assert_eq!(outcome.is_success(), !expected_failures[index]);
        }
    }
}
