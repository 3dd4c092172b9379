//! Worker count selection

use super::input::parse_positive;

/// Upper bound for heuristically chosen worker counts
pub const MAX_WORKERS: usize = 10;

/// Pick a pool size for `record_count` rows
///
/// Small batches get one worker per row, medium batches four, anything
/// larger the cap. Never returns zero.
pub fn determine_optimal_workers(record_count: usize) -> usize {
    match record_count {
        0..=4 => record_count.max(1),
        5..=8 => 4,
        _ => MAX_WORKERS,
    }
}

/// A valid explicit worker count wins; otherwise fall back to the heuristic
pub fn resolve_worker_count(explicit: Option<&str>, record_count: usize) -> usize {
    parse_positive(explicit).unwrap_or_else(|| determine_optimal_workers(record_count))
}
