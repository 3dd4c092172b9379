//! Result aggregation
//!
//! Per-row outcomes become [`ProcessedRow`]s, which are either joined into a
//! single string or wrapped with batch statistics in [`DetailedResults`].

use super::pool::RowOutcome;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Prefix placed in the response of a failed row
pub const ERROR_RESPONSE_PREFIX: &str = "Error processing query: ";

/// Default separator for string output
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Keys of [`DetailedResults`] that additional statistics cannot override
const RESERVED_KEYS: &[&str] = &[
    "results",
    "total_processed",
    "successful",
    "failed",
    "total_processing_time",
    "average_processing_time",
    "processor_type",
    "timestamp",
    "tool_usage",
    "total_queries",
];

/// Which component produced a batch; drives the extra statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Simple,
    Parallel,
    ParallelAgents,
    Integrated,
    Query,
    Generic,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Simple => "simple",
            ProcessorKind::Parallel => "parallel",
            ProcessorKind::ParallelAgents => "parallel_agents",
            ProcessorKind::Integrated => "integrated",
            ProcessorKind::Query => "query",
            ProcessorKind::Generic => "generic",
        }
    }

    fn tracks_tool_usage(&self) -> bool {
        matches!(
            self,
            ProcessorKind::Integrated | ProcessorKind::Parallel | ProcessorKind::ParallelAgents
        )
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent's contribution to a multi-agent row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentResponseRecord {
    pub agent: String,
    pub response: String,
    #[serde(default)]
    pub tools_called: Vec<String>,
    pub processing_time: f64,
}

/// What a processor's row function produces on success
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowAnswer {
    pub response: String,
    pub tools_called: Vec<String>,
    pub tool_responses: Vec<String>,
    pub agents_called: Vec<String>,
    pub agent_responses: Vec<AgentResponseRecord>,
    /// Overrides the measured wall-clock time when set
    pub processing_time: Option<f64>,
    /// Marks the row failed while keeping the partial agent record
    pub error: Option<String>,
}

impl RowAnswer {
    pub fn new(response: impl Into<String>, tools_called: Vec<String>) -> Self {
        Self {
            response: response.into(),
            tools_called,
            ..Default::default()
        }
    }
}

/// One output row, mapped by position to an input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessedRow {
    pub row_index: usize,
    pub worker_id: usize,
    pub query: String,
    pub response: String,
    pub success: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub tools_called: Vec<String>,
    /// Tool result text gathered while answering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_responses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents_called: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_responses: Vec<AgentResponseRecord>,
    /// Seconds spent producing the response; 0 for failed rows
    pub processing_time: f64,
}

impl ProcessedRow {
    /// Row for a query whose processing failed
    pub fn failure(
        row_index: usize,
        worker_id: usize,
        query: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            row_index,
            worker_id,
            query: query.into(),
            response: format!("{ERROR_RESPONSE_PREFIX}{message}"),
            success: false,
            error: Some(message),
            tools_called: Vec::new(),
            tool_responses: Vec::new(),
            agents_called: Vec::new(),
            agent_responses: Vec::new(),
            processing_time: 0.0,
        }
    }

    pub fn from_outcome(outcome: RowOutcome<RowAnswer>) -> Self {
        match outcome.result {
            Ok(RowAnswer {
                error: Some(message),
                agents_called,
                agent_responses,
                ..
            }) => Self {
                agents_called,
                agent_responses,
                ..Self::failure(outcome.row_index, outcome.worker_id, outcome.query, message)
            },
            Ok(answer) => Self {
                row_index: outcome.row_index,
                worker_id: outcome.worker_id,
                query: outcome.query,
                response: answer.response,
                success: true,
                error: None,
                tools_called: answer.tools_called,
                tool_responses: answer.tool_responses,
                agents_called: answer.agents_called,
                agent_responses: answer.agent_responses,
                processing_time: answer.processing_time.unwrap_or(outcome.elapsed),
            },
            Err(message) => Self::failure(
                outcome.row_index,
                outcome.worker_id,
                outcome.query,
                message,
            ),
        }
    }
}

/// Join row responses with `separator`; zero rows give an empty string
pub fn combine_results_as_string(rows: &[ProcessedRow], separator: &str) -> String {
    rows.iter()
        .map(|row| row.response.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Join rows as `Q: <query>\nA: <response>` blocks
pub fn combine_question_answers(rows: &[ProcessedRow], separator: &str) -> String {
    rows.iter()
        .map(|row| format!("Q: {}\nA: {}", row.query, row.response))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Rows plus batch statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetailedResults {
    pub results: Vec<ProcessedRow>,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_processing_time: f64,
    pub average_processing_time: f64,
    pub processor_type: ProcessorKind,
    /// RFC 3339, UTC
    pub timestamp: String,
    /// Calls per tool name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_usage: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_queries: Option<usize>,
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

impl DetailedResults {
    /// JSON schema of the detailed table, for hosts that validate outputs
    pub fn json_schema() -> Value {
        let schema = schemars::schema_for!(DetailedResults);
        serde_json::to_value(schema).unwrap_or(Value::Null)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Build the detailed table for a batch
///
/// Additional statistics are merged in, except for keys that would shadow
/// the fixed fields.
pub fn create_detailed_results(
    rows: Vec<ProcessedRow>,
    kind: ProcessorKind,
    additional: Option<BTreeMap<String, Value>>,
) -> DetailedResults {
    let total_processed = rows.len();
    let successful = rows.iter().filter(|row| row.success).count();
    let total_time: f64 = rows.iter().map(|row| row.processing_time).sum();
    let average = if total_processed > 0 {
        total_time / total_processed as f64
    } else {
        0.0
    };

    let tool_usage = kind.tracks_tool_usage().then(|| {
        let mut usage = BTreeMap::new();
        for tool in rows.iter().flat_map(|row| row.tools_called.iter()) {
            *usage.entry(tool.clone()).or_insert(0) += 1;
        }
        usage
    });

    let additional = additional
        .unwrap_or_default()
        .into_iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .collect();

    DetailedResults {
        results: rows,
        total_processed,
        successful,
        failed: total_processed - successful,
        total_processing_time: round3(total_time),
        average_processing_time: round3(average),
        processor_type: kind,
        timestamp: Utc::now().to_rfc3339(),
        tool_usage,
        total_queries: (kind == ProcessorKind::Query).then_some(total_processed),
        additional,
    }
}

/// Whole-batch failure reported in place of a detailed table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorReport {
    pub error: String,
    pub timestamp: String,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_row(index: usize, response: &str, tools: &[&str], time: f64) -> ProcessedRow {
        ProcessedRow {
            row_index: index,
            worker_id: 0,
            query: format!("q{index}"),
            response: response.to_string(),
            success: true,
            error: None,
            tools_called: tools.iter().map(|t| t.to_string()).collect(),
            tool_responses: Vec::new(),
            agents_called: Vec::new(),
            agent_responses: Vec::new(),
            processing_time: time,
        }
    }

    #[test]
    fn test_failure_row_shape() {
        let row = ProcessedRow::failure(3, 1, "what?", "boom");
        assert_eq!(row.response, "Error processing query: boom");
        assert_eq!(row.error.as_deref(), Some("boom"));
        assert!(!row.success);
        assert!(row.tools_called.is_empty());
        assert_eq!(row.processing_time, 0.0);
    }

    #[test]
    fn test_from_outcome_prefers_reported_time() {
        let outcome = RowOutcome {
            row_index: 0,
            worker_id: 2,
            query: "q".to_string(),
            result: Ok(RowAnswer {
                processing_time: Some(1.5),
                ..RowAnswer::new("a", vec![])
            }),
            elapsed: 0.2,
        };
        let row = ProcessedRow::from_outcome(outcome);
        assert!(row.success);
        assert_eq!(row.worker_id, 2);
        assert_eq!(row.processing_time, 1.5);
    }

    #[test]
    fn test_from_outcome_with_partial_failure_keeps_agents() {
        let record = AgentResponseRecord {
            agent: "Agent_1".to_string(),
            response: "ok".to_string(),
            tools_called: vec!["lookup".to_string()],
            processing_time: 0.1,
        };
        let outcome = RowOutcome {
            row_index: 4,
            worker_id: 1,
            query: "q".to_string(),
            result: Ok(RowAnswer {
                agents_called: vec!["Agent_1".to_string(), "Agent_2".to_string()],
                agent_responses: vec![record.clone()],
                error: Some("Agent_2: timeout".to_string()),
                ..RowAnswer::new("ok", vec!["lookup".to_string()])
            }),
            elapsed: 0.3,
        };

        let row = ProcessedRow::from_outcome(outcome);
        assert!(!row.success);
        assert_eq!(row.response, "Error processing query: Agent_2: timeout");
        assert!(row.tools_called.is_empty());
        assert_eq!(row.agent_responses, vec![record]);
        assert_eq!(row.agents_called.len(), 2);
    }

    #[test]
    fn test_combine_results_as_string() {
        let rows = vec![ok_row(0, "Answer 1", &[], 0.0), ok_row(1, "Answer 2", &[], 0.0)];
        assert_eq!(combine_results_as_string(&rows, "\n"), "Answer 1\nAnswer 2");
        assert_eq!(combine_results_as_string(&rows, "\n---\n"), "Answer 1\n---\nAnswer 2");
        assert_eq!(combine_results_as_string(&[], "\n"), "");
    }

    #[test]
    fn test_combine_question_answers() {
        let rows = vec![ok_row(0, "A1", &[], 0.0), ok_row(1, "A2", &[], 0.0)];
        assert_eq!(
            combine_question_answers(&rows, "\n\n"),
            "Q: q0\nA: A1\n\nQ: q1\nA: A2"
        );
        assert_eq!(combine_question_answers(&[], "\n"), "");
    }

    #[test]
    fn test_detailed_statistics() {
        let rows = vec![
            ok_row(0, "a", &["current_date"], 0.5),
            ok_row(1, "b", &["current_date", "lookup"], 0.3),
            ProcessedRow::failure(2, 0, "q2", "down"),
        ];
        let detailed = create_detailed_results(rows, ProcessorKind::Parallel, None);

        assert_eq!(detailed.total_processed, 3);
        assert_eq!(detailed.successful, 2);
        assert_eq!(detailed.failed, 1);
        assert_eq!(detailed.total_processing_time, 0.8);
        assert_eq!(detailed.average_processing_time, 0.267);
        let usage = detailed.tool_usage.expect("parallel tracks tools");
        assert_eq!(usage["current_date"], 2);
        assert_eq!(usage["lookup"], 1);
        assert_eq!(detailed.total_queries, None);
    }

    #[test]
    fn test_query_kind_counts_queries() {
        let detailed =
            create_detailed_results(vec![ok_row(0, "a", &[], 0.1)], ProcessorKind::Query, None);
        assert_eq!(detailed.total_queries, Some(1));
        assert!(detailed.tool_usage.is_none());

        let value = detailed.to_value();
        assert_eq!(value["processor_type"], "query");
        assert!(value.get("tool_usage").is_none());
    }

    #[test]
    fn test_zero_rows() {
        let detailed = create_detailed_results(Vec::new(), ProcessorKind::Simple, None);
        assert_eq!(detailed.total_processed, 0);
        assert_eq!(detailed.average_processing_time, 0.0);
        assert!(detailed.results.is_empty());
    }

    #[test]
    fn test_additional_stats_cannot_shadow_fixed_fields() {
        let mut extra = BTreeMap::new();
        extra.insert("agent_count".to_string(), json!(3));
        extra.insert("failed".to_string(), json!(99));

        let detailed = create_detailed_results(
            vec![ok_row(0, "a", &[], 0.1)],
            ProcessorKind::ParallelAgents,
            Some(extra),
        );
        let value = detailed.to_value();
        assert_eq!(value["agent_count"], 3);
        assert_eq!(value["failed"], 0);
    }

    #[test]
    fn test_json_schema_names_fields() {
        let schema = DetailedResults::json_schema();
        let properties = &schema["properties"];
        assert!(properties.get("results").is_some());
        assert!(properties.get("average_processing_time").is_some());
    }

    #[test]
    fn test_error_report() {
        let report = ErrorReport::new("no input");
        assert_eq!(report.error, "no input");
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
    }
}
