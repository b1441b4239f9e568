//! Storage-service DTOs: requests, stats, and summaries exchanged with
//! callers of the storage supervisor.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use yta_models::{FailedDownload, UnavailableVideo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveVideoRequest {
    pub video_id: String,
    pub video_path: String,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub captions: HashMap<String, String>,
    pub file_size: u64,
    pub download_completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoExistence {
    pub exists: bool,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub has_metadata: bool,
    #[serde(default)]
    pub has_thumbnail: bool,
    #[serde(default)]
    pub has_captions: Vec<String>,
    #[serde(default)]
    pub paths: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryPlanRequest {
    #[serde(default)]
    pub unavailable_videos: Vec<UnavailableVideo>,
    #[serde(default)]
    pub failed_downloads: Vec<FailedDownload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryPlanSummary {
    pub plan_id: String,
    pub path: String,
    pub total_videos: usize,
    pub unavailable_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_videos: usize,
    pub total_size_bytes: u64,
    pub total_size_human: String,
    pub metadata_count: usize,
    pub video_count: usize,
    pub thumbnail_count: usize,
    pub caption_count: usize,
    pub disk_usage: DiskUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_file: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_file: Option<DateTime<Utc>>,
}

/// Format a byte count with the same B/KB/MB/GB/TB/PB ladder as the
/// original `format_bytes` helper.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_across_units() {
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
