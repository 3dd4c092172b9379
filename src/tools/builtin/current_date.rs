//! Current date tool
//!
//! Lets an agent ask for "today" instead of guessing from its training data.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde_json::{json, Value};

const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reports the current date and time, optionally shifted by a UTC offset
#[derive(Debug, Clone)]
pub struct CurrentDateTool {
    default_offset_hours: i32,
}

impl CurrentDateTool {
    pub fn new() -> Self {
        Self {
            default_offset_hours: 0,
        }
    }

    fn offset(hours: i32) -> Result<FixedOffset, ToolError> {
        FixedOffset::east_opt(hours * 3600).ok_or_else(|| {
            ToolError::ExecutionError(format!("UTC offset {hours}h is out of range"))
        })
    }
}

impl Default for CurrentDateTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentDateTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "current_date".to_string(),
            description: "Returns the current date and time.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "utc_offset_hours": {
                        "type": "integer",
                        "minimum": -12,
                        "maximum": 14,
                        "description": "Hours to shift from UTC"
                    }
                },
                "additionalProperties": false
            }),
        }
    }

    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError> {
        if let Some(hours) = config.and_then(|c| c.get("utc_offset_hours")) {
            let hours = hours.as_i64().ok_or_else(|| {
                ToolError::InitializationError("utc_offset_hours must be an integer".to_string())
            })?;
            self.default_offset_hours = i32::try_from(hours).map_err(|_| {
                ToolError::InitializationError(format!("utc_offset_hours {hours} out of range"))
            })?;
            Self::offset(self.default_offset_hours)
                .map_err(|e| ToolError::InitializationError(e.to_string()))?;
        }
        Ok(())
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let hours = parameters
            .get("utc_offset_hours")
            .and_then(Value::as_i64)
            .map(|h| h as i32)
            .unwrap_or(self.default_offset_hours);

        let now = Utc::now().with_timezone(&Self::offset(hours)?);
        Ok(json!({
            "date": now.format(DEFAULT_FORMAT).to_string(),
            "iso8601": now.to_rfc3339(),
            "utc_offset_hours": hours,
        }))
    }
}
