//! File-backed storage supervisor (C4): writes video/metadata records to
//! disk via a temp-file-then-rename sequence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::models::{
    format_bytes, DiskUsage, RecoveryPlanSummary, SaveVideoRequest, StorageStats, VideoExistence,
};
use yta_models::{FailedDownload, UnavailableVideo};

/// Atomically write `contents` to `path` by writing to a sibling temp file
/// and renaming over the target. `rename` is atomic on POSIX filesystems
/// as long as source and destination share a filesystem, which they do here.
async fn write_atomic(path: &Path, contents: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
    pub recovery_plans_dir: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let base_dir = std::env::var("YTA_STORAGE_BASE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/storage"));
        let recovery_plans_dir = std::env::var("YTA_RECOVERY_PLANS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("recovery_plans"));
        Self {
            base_dir,
            recovery_plans_dir,
        }
    }
}

pub struct StorageClient {
    config: StorageConfig,
}

impl StorageClient {
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        for dir in [
            config.base_dir.join("metadata").join("videos"),
            config.base_dir.join("metadata").join("playlists"),
            config.base_dir.join("videos"),
            config.recovery_plans_dir.clone(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(Self { config })
    }

    fn metadata_path(&self, video_id: &str) -> PathBuf {
        self.config
            .base_dir
            .join("metadata")
            .join("videos")
            .join(format!("{video_id}.json"))
    }

    fn video_dir(&self, video_id: &str) -> PathBuf {
        self.config.base_dir.join("videos").join(video_id)
    }

    pub async fn save_metadata(&self, video_id: &str, metadata: Value) -> StorageResult<PathBuf> {
        let mut value = match metadata {
            Value::Object(map) => Value::Object(map),
            other => other,
        };
        if let Value::Object(map) = &mut value {
            map.insert(
                "storage_info".to_string(),
                serde_json::json!({
                    "stored_at": Utc::now().to_rfc3339(),
                    "video_id": video_id,
                }),
            );
        }
        let path = self.metadata_path(video_id);
        let rendered = serde_json::to_string_pretty(&value)?;
        write_atomic(&path, &rendered).await?;
        info!(video_id, path = %path.display(), "saved metadata");
        Ok(path)
    }

    pub async fn save_video_info(&self, request: &SaveVideoRequest) -> StorageResult<PathBuf> {
        let video_dir = self.video_dir(&request.video_id);
        tokio::fs::create_dir_all(&video_dir).await?;

        let info = serde_json::json!({
            "video_id": request.video_id,
            "video_path": request.video_path,
            "thumbnail_path": request.thumbnail_path,
            "captions": request.captions,
            "file_size": request.file_size,
            "download_completed_at": request.download_completed_at.to_rfc3339(),
            "stored_at": Utc::now().to_rfc3339(),
        });

        let path = video_dir.join(format!("{}_info.json", request.video_id));
        write_atomic(&path, &serde_json::to_string_pretty(&info)?).await?;
        Ok(path)
    }

    pub async fn check_exists(&self, video_id: &str) -> StorageResult<VideoExistence> {
        let mut existence = VideoExistence::default();
        let metadata_path = self.metadata_path(video_id);

        if let Ok(meta) = tokio::fs::metadata(&metadata_path).await {
            existence.has_metadata = true;
            existence
                .paths
                .insert("metadata".to_string(), metadata_path.display().to_string());
            if let Ok(modified) = meta.modified() {
                existence.last_modified = Some(modified.into());
            }
        }

        let video_dir = self.video_dir(video_id);
        if tokio::fs::metadata(&video_dir).await.is_ok() {
            let video_file = video_dir.join(format!("{video_id}.mp4"));
            if tokio::fs::metadata(&video_file).await.is_ok() {
                existence.has_video = true;
                existence
                    .paths
                    .insert("video".to_string(), video_file.display().to_string());
            }

            let thumb_file = video_dir.join(format!("{video_id}_thumb.jpg"));
            if tokio::fs::metadata(&thumb_file).await.is_ok() {
                existence.has_thumbnail = true;
                existence
                    .paths
                    .insert("thumbnail".to_string(), thumb_file.display().to_string());
            }

            let captions_dir = video_dir.join("captions");
            if let Ok(mut entries) = tokio::fs::read_dir(&captions_dir).await {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("vtt") {
                        continue;
                    }
                    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    if let Some(lang) = stem.rsplit('_').next() {
                        existence.has_captions.push(lang.to_string());
                        existence
                            .paths
                            .insert(format!("caption_{lang}"), path.display().to_string());
                    }
                }
            }
        }

        existence.exists = existence.has_metadata || existence.has_video;
        Ok(existence)
    }

    pub async fn get_stored_metadata(&self, video_id: &str) -> StorageResult<Value> {
        let metadata_path = self.metadata_path(video_id);
        let raw = tokio::fs::read_to_string(&metadata_path)
            .await
            .map_err(|_| StorageError::not_found(video_id))?;
        let metadata: Value = serde_json::from_str(&raw)?;

        let info_path = self
            .video_dir(video_id)
            .join(format!("{video_id}_info.json"));
        let mut storage_info = metadata
            .get("storage_info")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        if let Ok(info_raw) = tokio::fs::read_to_string(&info_path).await {
            if let Ok(Value::Object(info_map)) = serde_json::from_str::<Value>(&info_raw) {
                if let Value::Object(storage_map) = &mut storage_info {
                    for (k, v) in info_map {
                        storage_map.insert(k, v);
                    }
                }
            }
        }

        Ok(serde_json::json!({
            "video_id": video_id,
            "metadata": metadata,
            "storage_info": storage_info,
        }))
    }

    pub async fn generate_recovery_plan(
        &self,
        unavailable_videos: Vec<UnavailableVideo>,
        failed_downloads: Vec<FailedDownload>,
    ) -> StorageResult<RecoveryPlanSummary> {
        let now = Utc::now();
        let plan_id = now.format("%Y%m%d_%H%M%S").to_string();
        let unavailable_count = unavailable_videos.len();
        let failed_count = failed_downloads.len();

        let plan = serde_json::json!({
            "plan_id": plan_id,
            "created_at": now.to_rfc3339(),
            "unavailable_videos": unavailable_videos,
            "failed_downloads": failed_downloads,
            "total_videos": unavailable_count + failed_count,
            "unavailable_count": unavailable_count,
            "failed_count": failed_count,
            "notes": format!(
                "Generated recovery plan for {unavailable_count} unavailable and {failed_count} failed videos"
            ),
        });

        let path = self
            .config
            .recovery_plans_dir
            .join(format!("{plan_id}_plan.json"));
        write_atomic(&path, &serde_json::to_string_pretty(&plan)?).await?;

        Ok(RecoveryPlanSummary {
            plan_id,
            path: path.display().to_string(),
            total_videos: unavailable_count + failed_count,
            unavailable_count,
            failed_count,
        })
    }

    pub async fn stats(&self) -> StorageResult<StorageStats> {
        let metadata_dir = self.config.base_dir.join("metadata").join("videos");
        let mut metadata_count = 0usize;
        if let Ok(mut entries) = tokio::fs::read_dir(&metadata_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                    metadata_count += 1;
                }
            }
        }

        let videos_dir = self.config.base_dir.join("videos");
        let mut total_size = 0u64;
        let mut video_count = 0usize;
        let mut thumbnail_count = 0usize;
        let mut caption_count = 0usize;
        let mut oldest_file = None;
        let mut newest_file = None;
        let mut total_videos = 0usize;

        if let Ok(mut entries) = tokio::fs::read_dir(&videos_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                total_videos += 1;
                let video_id = entry.file_name().to_string_lossy().to_string();

                let video_file = path.join(format!("{video_id}.mp4"));
                if let Ok(meta) = tokio::fs::metadata(&video_file).await {
                    video_count += 1;
                    total_size += meta.len();
                    if let Ok(modified) = meta.modified() {
                        let dt: chrono::DateTime<Utc> = modified.into();
                        let older = match oldest_file {
                            Some(o) => dt < o,
                            None => true,
                        };
                        if older {
                            oldest_file = Some(dt);
                        }
                        let newer = match newest_file {
                            Some(n) => dt > n,
                            None => true,
                        };
                        if newer {
                            newest_file = Some(dt);
                        }
                    }
                }

                let thumb_file = path.join(format!("{video_id}_thumb.jpg"));
                if let Ok(meta) = tokio::fs::metadata(&thumb_file).await {
                    thumbnail_count += 1;
                    total_size += meta.len();
                }

                let captions_dir = path.join("captions");
                if let Ok(mut caption_entries) = tokio::fs::read_dir(&captions_dir).await {
                    while let Ok(Some(cap_entry)) = caption_entries.next_entry().await {
                        if cap_entry.path().extension().and_then(|e| e.to_str()) == Some("vtt") {
                            caption_count += 1;
                            if let Ok(meta) = cap_entry.metadata().await {
                                total_size += meta.len();
                            }
                        }
                    }
                }
            }
        }

        debug!(total_videos, video_count, total_size, "computed storage stats");

        Ok(StorageStats {
            total_videos,
            total_size_bytes: total_size,
            total_size_human: format_bytes(total_size),
            metadata_count,
            video_count,
            thumbnail_count,
            caption_count,
            disk_usage: DiskUsage::default(),
            oldest_file,
            newest_file,
        })
    }
}
