//! C4: storage supervisor. File-backed metadata/video-info/recovery-plan
//! persistence, existence checks, and stats.

pub mod client;
pub mod error;
pub mod models;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use models::{
    format_bytes, DiskUsage, RecoveryPlanRequest, RecoveryPlanSummary, SaveVideoRequest,
    StorageStats, VideoExistence,
};
