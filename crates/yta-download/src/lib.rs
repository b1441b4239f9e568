//! C5: download supervisor. Task table, bounded-concurrency workers,
//! progress tracking, and cooperative cancellation.

pub mod downloader;
pub mod error;
pub mod quality;
pub mod supervisor;

pub use downloader::{ProgressCallback, ProgressUpdate, VideoDownloader, YtDlpDownloader};
pub use error::{DownloadError, DownloadResult};
pub use quality::format_selector;
pub use supervisor::DownloadSupervisor;
