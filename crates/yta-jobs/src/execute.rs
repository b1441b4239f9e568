//! Single-video execution (spec.md §4.3.2): extract the video id, resolve a
//! storage path, start a download, poll progress to a terminal state, and
//! record the result. Wrapped in the error-recovery manager's exponential
//! backoff and the download error handler.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use yta_models::{extract_youtube_id, DownloadStatus, Job, JobType};
use yta_recovery::RecoverableError;
use yta_storage::SaveVideoRequest;

use crate::state::AppState;

#[derive(Debug)]
struct DownloadStepError(String);

impl std::fmt::Display for DownloadStepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RecoverableError for DownloadStepError {
    fn exception_type(&self) -> &'static str {
        "DownloadStepError"
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLLS: u32 = 7200;

/// Execute a single `VIDEO_DOWNLOAD` or `METADATA_ONLY` job to completion,
/// returning the job transitioned to its terminal status. Never panics; all
/// failures are folded into a `FAILED` job with `error_details` set.
pub async fn execute_video_job(state: &AppState, job: Job) -> Job {
    let job = job.start();
    if let Err(e) = state.jobs.save(job.clone()).await {
        warn!(job_id = %job.job_id, error = %e, "failed to persist RUNNING transition");
    }

    let url = match job.urls.first() {
        Some(u) => u.clone(),
        None => return finish_failed(state, job, "job has no urls".to_string()).await,
    };

    let video_id = match extract_youtube_id(&url) {
        Ok(id) => id,
        Err(e) => return finish_failed(state, job, format!("invalid youtube url: {e}")).await,
    };

    if matches!(job.job_type, JobType::MetadataOnly) {
        return match state.metadata.get_video_metadata(&video_id).await {
            Ok(_) => finish_completed(state, job).await,
            Err(e) => finish_failed(state, job, e.to_string()).await,
        };
    }

    let quality = job.quality();
    let output_path = format!("{}/videos/{video_id}", state.config.storage_base_dir);

    let context = yta_models::RetryContext::new("execute_video_job").with_video_id(video_id.clone());

    let download = state.download.clone();
    let result = state
        .download_recovery
        .execute_with_retry("execute_video_job", context, || {
            let download = download.clone();
            let video_id = video_id.clone();
            let quality = quality.clone();
            let output_path = output_path.clone();
            let job_id = job.job_id.as_str().to_string();
            async move {
                run_download_to_completion(&download, video_id, quality, output_path, job_id)
                    .await
                    .map_err(DownloadStepError)
            }
        })
        .await;

    match result {
        Ok(file_path) => {
            let save_request = SaveVideoRequest {
                video_id: video_id.clone(),
                video_path: file_path,
                thumbnail_path: None,
                captions: Default::default(),
                file_size: 0,
                download_completed_at: Utc::now(),
            };
            if let Err(e) = state.storage.save_video_info(&save_request).await {
                warn!(job_id = %job.job_id, error = %e, "failed to record completed download in storage");
            }
            finish_completed(state, job).await
        }
        Err(e) => finish_failed(state, job, e.to_string()).await,
    }
}

async fn run_download_to_completion(
    download: &std::sync::Arc<yta_download::DownloadSupervisor>,
    video_id: String,
    quality: String,
    output_path: String,
    job_id: String,
) -> Result<String, String> {
    let request = yta_models::DownloadRequest {
        video_id,
        quality,
        output_path,
        include_captions: true,
        caption_languages: vec!["en".to_string()],
        resume: true,
        job_id: Some(job_id),
    };

    let task = download.start_download(request).await.map_err(|e| e.to_string())?;
    let task_id = task.task_id.as_str().to_string();

    for _ in 0..MAX_POLLS {
        let progress = download.progress(&task_id).await.map_err(|e| e.to_string())?;
        match progress.status {
            DownloadStatus::Completed => {
                return Ok(progress.file_path.unwrap_or_default());
            }
            DownloadStatus::Failed => {
                return Err(progress.error.unwrap_or_else(|| "download failed".to_string()));
            }
            DownloadStatus::Cancelled => {
                return Err("download cancelled".to_string());
            }
            _ => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
    Err("download timed out waiting for completion".to_string())
}

async fn finish_completed(state: &AppState, job: Job) -> Job {
    let job = job.complete();
    persist(state, job).await
}

async fn finish_failed(state: &AppState, job: Job, error: String) -> Job {
    info!(job_id = %job.job_id, %error, "job failed");
    let job = job.fail(error.clone());
    let job = persist(state, job).await;
    crate::workplan::submit_failure_plan(&state.storage, &job, &error).await;
    job
}

async fn persist(state: &AppState, job: Job) -> Job {
    match state.jobs.save(job.clone()).await {
        Ok(saved) => saved,
        Err(e) => {
            warn!(job_id = %job.job_id, error = %e, "failed to persist terminal job state");
            job
        }
    }
}
