//! In-memory download task and progress records owned by the download supervisor.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Download quality selector. The downloader's format-selector string per
/// key is fixed in `yta-download::quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Best,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    Audio,
}

impl Quality {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "best" => Some(Quality::Best),
            "1080p" => Some(Quality::P1080),
            "720p" => Some(Quality::P720),
            "480p" => Some(Quality::P480),
            "360p" => Some(Quality::P360),
            "audio" => Some(Quality::Audio),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::Audio => "audio",
        }
    }
}

/// Download task status. `Paused` is reserved and never driven by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Cancelled,
    Paused,
}

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed | DownloadStatus::Cancelled
        )
    }
}

/// A unique identifier for a download task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request to start a download, mirroring the external `POST
/// /api/v1/download/video` payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DownloadRequest {
    pub video_id: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    pub output_path: String,
    #[serde(default = "default_true")]
    pub include_captions: bool,
    #[serde(default = "default_caption_langs")]
    pub caption_languages: Vec<String>,
    /// Resume a partial `.part` download instead of restarting from zero.
    #[serde(default = "default_true")]
    pub resume: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

fn default_quality() -> String {
    "1080p".to_string()
}

fn default_true() -> bool {
    true
}

fn default_caption_langs() -> Vec<String> {
    vec!["en".to_string()]
}

/// A download task's durable-for-the-process-lifetime bookkeeping record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DownloadTask {
    pub task_id: TaskId,
    pub video_id: String,
    pub status: DownloadStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub quality: String,
}

/// Live progress for a download task, updated in place by the downloader's
/// progress callback.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DownloadProgress {
    pub task_id: TaskId,
    pub video_id: String,
    pub status: DownloadStatus,
    pub progress_percent: f64,
    pub downloaded_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadProgress {
    pub fn pending(task_id: TaskId, video_id: impl Into<String>) -> Self {
        Self {
            task_id,
            video_id: video_id.into(),
            status: DownloadStatus::Pending,
            progress_percent: 0.0,
            downloaded_bytes: 0,
            total_bytes: None,
            speed: None,
            eta: None,
            file_path: None,
            error: None,
        }
    }
}

/// A single yt-dlp-reported format.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoFormat {
    pub format_id: String,
    pub ext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AvailableFormats {
    pub video_id: String,
    pub formats: Vec<VideoFormat>,
    pub best_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_round_trips() {
        for raw in ["best", "1080p", "720p", "480p", "360p", "audio"] {
            let q = Quality::parse(raw).expect("known quality");
            assert_eq!(q.as_str(), raw);
        }
        assert!(Quality::parse("4k").is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(DownloadStatus::Completed.is_terminal());
        assert!(DownloadStatus::Failed.is_terminal());
        assert!(DownloadStatus::Cancelled.is_terminal());
        assert!(!DownloadStatus::Downloading.is_terminal());
        assert!(!DownloadStatus::Pending.is_terminal());
    }

    #[test]
    fn pending_progress_starts_at_zero() {
        let p = DownloadProgress::pending(TaskId::new(), "abc");
        assert_eq!(p.progress_percent, 0.0);
        assert_eq!(p.downloaded_bytes, 0);
    }
}
