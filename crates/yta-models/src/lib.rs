//! Shared data models for the YTArchive job-orchestration fabric.
//!
//! This crate provides serde-serializable types with no I/O dependencies,
//! shared across every component crate (C1–C7):
//! - Job lifecycle and persistence shape (§3, §4.3.1)
//! - Download task/progress records (§3, §4.4)
//! - Service registry records (§3, §4.3.5)
//! - Work/recovery plan records (§3, §4.3.4, §4.6)
//! - Retry/error-recovery vocabulary shared between C1 and C2 (§3, §4.1)
//! - Metadata/cache/quota records (§3, §4.5)
//! - YouTube URL parsing utilities (video id, playlist id, duration)

pub mod download_task;
pub mod error_report;
pub mod job;
pub mod metadata;
pub mod plan;
pub mod registry;
pub mod retry;
pub mod youtube_url;

pub use download_task::{
    AvailableFormats, DownloadProgress, DownloadRequest, DownloadStatus, DownloadTask, Quality,
    TaskId, VideoFormat,
};
pub use error_report::{ErrorReport, ErrorSummary, ErrorSummaryEntry};
pub use job::{Job, JobId, JobProgress, JobStatus, JobType};
pub use metadata::{CacheEntry, PlaylistMetadata, PlaylistVideoEntry, QuotaStatus, VideoMetadata};
pub use plan::{FailedDownload, PlanTotals, UnavailableReason, UnavailableVideo, WorkPlan};
pub use registry::{RegisteredService, ServiceRegistration};
pub use retry::{ErrorSeverity, RetryConfig, RetryConfigError, RetryContext, RetryReason};
pub use youtube_url::{
    extract_playlist_id, extract_youtube_id, parse_iso8601_duration, YoutubeIdError,
    YoutubeIdResult,
};
