//! Recovery/work-plan records produced when downloads fail (C4/C7).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Private,
    Deleted,
    RegionBlocked,
    AgeRestricted,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnavailableVideo {
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub reason: UnavailableReason,
    pub detected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_available: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FailedDownload {
    pub video_id: String,
    pub title: String,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanTotals {
    pub unavailable: usize,
    pub failed: usize,
    pub total_videos: usize,
}

/// Append-only recovery plan, one file per `GeneratePlan` call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkPlan {
    pub plan_id: String,
    pub created_at: DateTime<Utc>,
    pub unavailable_videos: Vec<UnavailableVideo>,
    pub failed_downloads: Vec<FailedDownload>,
    pub totals: PlanTotals,
}

impl WorkPlan {
    pub fn new(unavailable: Vec<UnavailableVideo>, failed: Vec<FailedDownload>) -> Self {
        let now = Utc::now();
        let plan_id = now.format("%Y%m%d_%H%M%S").to_string();
        let totals = PlanTotals {
            unavailable: unavailable.len(),
            failed: failed.len(),
            total_videos: unavailable.len() + failed.len(),
        };
        Self {
            plan_id,
            created_at: now,
            unavailable_videos: unavailable,
            failed_downloads: failed,
            totals,
        }
    }

    pub fn filename(&self) -> String {
        format!("{}_plan.json", self.plan_id)
    }
}
