//! Error report record produced by the C1 error reporter.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::retry::{ErrorSeverity, RetryContext};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorReport {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: ErrorSeverity,
    pub title: String,
    pub message: String,
    pub exception_type: String,
    pub context: RetryContext,
    pub suggested_actions: Vec<String>,
    pub recovery_possible: bool,
    pub retry_recommended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorSummaryEntry {
    pub id: String,
    pub severity: ErrorSeverity,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorSummary {
    pub time_range_hours: u32,
    pub total_errors: usize,
    pub severity_breakdown: std::collections::HashMap<String, usize>,
    pub recent_errors: Vec<ErrorSummaryEntry>,
}
