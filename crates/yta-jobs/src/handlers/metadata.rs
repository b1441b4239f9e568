//! Metadata-supervisor passthrough (spec.md §4.6, §6): composes
//! `yta_metadata::MetadataClient` in-process rather than proxying to a
//! separate service.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use yta_metadata::BatchFetchResult;
use yta_models::{PlaylistMetadata, QuotaStatus, VideoMetadata};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchFetchRequest {
    pub video_ids: Vec<String>,
}

pub async fn get_video_metadata(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoMetadata>> {
    Ok(Json(state.metadata.get_video_metadata(&video_id).await?))
}

pub async fn get_playlist_metadata(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<Json<PlaylistMetadata>> {
    Ok(Json(state.metadata.get_playlist_metadata(&playlist_id).await?))
}

pub async fn batch_fetch(
    State(state): State<AppState>,
    Json(request): Json<BatchFetchRequest>,
) -> ApiResult<Json<BatchFetchResult>> {
    Ok(Json(state.metadata.batch_fetch(&request.video_ids).await?))
}

pub async fn quota_status(State(state): State<AppState>) -> ApiResult<Json<QuotaStatus>> {
    Ok(Json(state.metadata.quota_status()))
}
