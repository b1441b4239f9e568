//! Failure-to-work-plan derivation (spec.md §4.3.4): when a job transitions
//! to FAILED, derive `failed_downloads` from its URLs and hand them to the
//! storage supervisor's `GenerateRecoveryPlan`, swallowing transport errors.

use chrono::Utc;
use tracing::warn;
use yta_models::{extract_youtube_id, FailedDownload, Job};
use yta_storage::StorageClient;

/// Best-effort: failures here are logged and suppressed per SPEC_FULL.md §C.3,
/// matching the original's "submission failures must never fail the parent
/// job transition".
pub async fn submit_failure_plan(storage: &StorageClient, job: &Job, error: &str) {
    let failed_downloads: Vec<FailedDownload> = job
        .urls
        .iter()
        .filter_map(|url| extract_youtube_id(url).ok())
        .map(|video_id| FailedDownload {
            title: video_id.clone(),
            video_id,
            attempts: 1,
            last_attempt: Utc::now(),
            errors: vec![error.to_string()],
            file_size: None,
            retry_after: None,
        })
        .collect();

    if failed_downloads.is_empty() {
        return;
    }

    if let Err(e) = storage
        .generate_recovery_plan(Vec::new(), failed_downloads)
        .await
    {
        warn!(job_id = %job.job_id, error = %e, "failed to submit work-plan for failed job");
    }
}
