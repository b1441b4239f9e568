//! Download-supervisor passthrough (spec.md §4.4, §6): composes
//! `yta_download::DownloadSupervisor` in-process rather than proxying to a
//! separate service.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use yta_models::{AvailableFormats, DownloadProgress, DownloadRequest, DownloadTask};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartDownloadRequest {
    pub video_id: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    pub output_path: String,
    #[serde(default = "default_true")]
    pub include_captions: bool,
    #[serde(default = "default_caption_languages")]
    pub caption_languages: Vec<String>,
    #[serde(default = "default_true")]
    pub resume: bool,
    #[serde(default)]
    pub job_id: Option<String>,
}

fn default_quality() -> String {
    "1080p".to_string()
}

fn default_true() -> bool {
    true
}

fn default_caption_languages() -> Vec<String> {
    vec!["en".to_string()]
}

pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<StartDownloadRequest>,
) -> ApiResult<Json<DownloadTask>> {
    let task = state
        .download
        .start_download(DownloadRequest {
            video_id: request.video_id,
            quality: request.quality,
            output_path: request.output_path,
            include_captions: request.include_captions,
            caption_languages: request.caption_languages,
            resume: request.resume,
            job_id: request.job_id,
        })
        .await?;
    Ok(Json(task))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<DownloadProgress>> {
    Ok(Json(state.download.progress(&task_id).await?))
}

pub async fn cancel_download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.download.cancel(&task_id).await?;
    Ok(Json(serde_json::json!({ "cancelled": task_id })))
}

pub async fn get_formats(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<AvailableFormats>> {
    Ok(Json(state.download.formats(&video_id).await?))
}
