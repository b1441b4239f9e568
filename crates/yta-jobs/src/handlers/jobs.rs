//! Job CRUD and execution handlers (spec.md §4.3.1-§4.3.3).

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use yta_models::{Job, JobStatus, JobType};

use crate::error::{ApiError, ApiResult};
use crate::execute::execute_video_job;
use crate::playlist::execute_playlist_job;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    pub job_type: JobType,
    #[validate(length(min = 1, message = "at least one url is required"))]
    pub urls: Vec<String>,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    pub limit: Option<usize>,
}

fn is_valid_job_id(job_id: &str) -> bool {
    (8..=64).contains(&job_id.len())
        && job_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<Json<Job>> {
    request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let job = Job::new(request.job_type, request.urls, request.options);
    let created = state.jobs.create(job).await?;
    info!(job_id = %created.job_id, "created job");
    Ok(Json(created))
}

pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<Job>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::bad_request("malformed job id"));
    }
    Ok(Json(state.jobs.get(&job_id).await?))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(state.jobs.list(query.status, query.limit).await?))
}

pub async fn delete_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::bad_request("malformed job id"));
    }
    state.jobs.delete(&job_id).await?;
    Ok(Json(serde_json::json!({ "deleted": job_id })))
}

/// `Execute` (spec.md §4.3.2/§4.3.3): dispatches on job type, runs to
/// completion synchronously, and returns the terminal job. Concurrent
/// `Execute` calls for the same id are last-writer-wins per SPEC_FULL.md's
/// concurrency decision; the per-job lock in `JobStore` only prevents torn
/// writes, not duplicate execution.
pub async fn execute_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<Job>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::bad_request("malformed job id"));
    }
    let job = state.jobs.get(&job_id).await?;
    if !job.status.can_execute() {
        return Err(ApiError::bad_request(format!(
            "job {job_id} is {} and cannot be executed",
            job.status.as_str()
        )));
    }

    let executed = match job.job_type {
        JobType::PlaylistDownload => execute_playlist_job(&state, job).await,
        JobType::VideoDownload | JobType::MetadataOnly => execute_video_job(&state, job).await,
    };
    Ok(Json(executed))
}

pub async fn get_playlist_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let path = std::path::Path::new(&state.config.playlist_results_dir)
        .join(format!("playlist_{job_id}.json"));
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("no playlist results for job {job_id}")))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_validation_matches_uuid_length() {
        let uuid = uuid::Uuid::new_v4().to_string();
        assert!(is_valid_job_id(&uuid));
        assert!(!is_valid_job_id("short"));
        assert!(!is_valid_job_id("has spaces and $ymbols!!"));
    }
}
