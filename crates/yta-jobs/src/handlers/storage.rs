//! Storage-supervisor passthrough (spec.md §4.6, §6): composes
//! `yta_storage::StorageClient` in-process rather than proxying to a
//! separate service.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use yta_storage::{
    RecoveryPlanRequest, RecoveryPlanSummary, SaveVideoRequest, StorageStats, VideoExistence,
};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveMetadataRequest {
    pub video_id: String,
    pub metadata: serde_json::Value,
}

pub async fn save_metadata(
    State(state): State<AppState>,
    Json(request): Json<SaveMetadataRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let path = state
        .storage
        .save_metadata(&request.video_id, request.metadata)
        .await?;
    Ok(Json(serde_json::json!({ "path": path })))
}

pub async fn save_video(
    State(state): State<AppState>,
    Json(request): Json<SaveVideoRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let path = state.storage.save_video_info(&request).await?;
    Ok(Json(serde_json::json!({ "path": path })))
}

pub async fn check_exists(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoExistence>> {
    Ok(Json(state.storage.check_exists(&video_id).await?))
}

pub async fn get_stored_metadata(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.storage.get_stored_metadata(&video_id).await?))
}

pub async fn generate_recovery_plan(
    State(state): State<AppState>,
    Json(request): Json<RecoveryPlanRequest>,
) -> ApiResult<Json<RecoveryPlanSummary>> {
    Ok(Json(
        state
            .storage
            .generate_recovery_plan(request.unavailable_videos, request.failed_downloads)
            .await?,
    ))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StorageStats>> {
    Ok(Json(state.storage.stats().await?))
}
