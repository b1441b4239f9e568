//! The archival job: identity, lifecycle, and persisted shape.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job. A 128-bit UUID rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of work a job represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    VideoDownload,
    PlaylistDownload,
    MetadataOnly,
}

/// Job lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether a job currently in this status is eligible for `Execute`.
    pub fn can_execute(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Failed)
    }
}

/// Progress tracking attached to a parent playlist job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct JobProgress {
    pub total: u64,
    pub completed: u64,
    pub successful: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
}

/// A job as persisted to `jobs/{id}.json`. The file is the source of truth;
/// this struct round-trips losslessly through `serde_json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub job_id: JobId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub urls: Vec<String>,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
}

impl Job {
    /// Create a new job in `PENDING`, stamped with the current time.
    pub fn new(job_type: JobType, urls: Vec<String>, options: HashMap<String, serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            job_type,
            status: JobStatus::Pending,
            urls,
            options,
            created_at: now,
            updated_at: now,
            error_details: None,
            progress: None,
        }
    }

    /// Return the `quality` option, defaulting to `"best"` as the download
    /// supervisor does for an absent option.
    pub fn quality(&self) -> String {
        self.options
            .get("quality")
            .and_then(|v| v.as_str())
            .unwrap_or("best")
            .to_string()
    }

    /// Consuming transition to RUNNING.
    pub fn start(mut self) -> Self {
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
        self
    }

    /// Consuming transition to COMPLETED.
    pub fn complete(mut self) -> Self {
        self.status = JobStatus::Completed;
        self.updated_at = Utc::now();
        self
    }

    /// Consuming transition to FAILED with a human-readable detail string.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.error_details = Some(error.into());
        self.updated_at = Utc::now();
        self
    }

    /// Consuming transition to CANCELLED.
    pub fn cancel(mut self) -> Self {
        self.status = JobStatus::Cancelled;
        self.updated_at = Utc::now();
        self
    }

    pub fn with_progress(mut self, progress: JobProgress) -> Self {
        self.progress = Some(progress);
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending() {
        let job = Job::new(JobType::VideoDownload, vec!["https://youtu.be/x".into()], HashMap::new());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error_details.is_none());
    }

    #[test]
    fn lifecycle_transitions() {
        let job = Job::new(JobType::VideoDownload, vec![], HashMap::new());
        let running = job.start();
        assert_eq!(running.status, JobStatus::Running);
        let completed = running.complete();
        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.status.is_terminal());
    }

    #[test]
    fn failed_job_can_execute_again() {
        let job = Job::new(JobType::VideoDownload, vec![], HashMap::new()).fail("boom");
        assert!(job.status.can_execute());
        assert_eq!(job.error_details.as_deref(), Some("boom"));
    }

    #[test]
    fn quality_defaults_to_best() {
        let job = Job::new(JobType::VideoDownload, vec![], HashMap::new());
        assert_eq!(job.quality(), "best");
    }

    #[test]
    fn round_trips_through_json() {
        let job = Job::new(JobType::PlaylistDownload, vec!["u".into()], HashMap::new());
        let text = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&text).unwrap();
        assert_eq!(back.job_id, job.job_id);
        assert_eq!(back.status, job.status);
    }
}
