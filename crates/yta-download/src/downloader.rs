//! The downloader collaborator: a blocking synchronous tool (yt-dlp)
//! wrapped so the cooperative scheduler stays responsive (spec.md §4.4.1).

use async_trait::async_trait;
use yta_models::VideoFormat;

#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub speed: Option<f64>,
    pub eta: Option<u64>,
    pub finished: bool,
    pub filename: Option<String>,
}

pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Abstraction over the actual download tool, so the supervisor can be
/// exercised with a fake in tests without invoking a real subprocess.
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    async fn download(
        &self,
        video_id: &str,
        format_selector: &str,
        output_path: &str,
        on_progress: ProgressCallback,
    ) -> Result<String, String>;

    async fn extract_formats(&self, video_id: &str) -> Result<Vec<VideoFormat>, String>;
}

/// Real yt-dlp-backed downloader. The blocking subprocess call runs on
/// `spawn_blocking` so it never parks the async runtime's worker threads.
pub struct YtDlpDownloader {
    binary: std::path::PathBuf,
}

impl YtDlpDownloader {
    pub fn discover() -> Result<Self, String> {
        let binary = which::which("yt-dlp").map_err(|e| format!("yt-dlp not found: {e}"))?;
        Ok(Self { binary })
    }
}

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    async fn download(
        &self,
        video_id: &str,
        format_selector: &str,
        output_path: &str,
        on_progress: ProgressCallback,
    ) -> Result<String, String> {
        let binary = self.binary.clone();
        let video_id = video_id.to_string();
        let format_selector = format_selector.to_string();
        let output_path = output_path.to_string();

        // yt-dlp streams progress on stdout; a real implementation parses
        // that stream and calls `on_progress` per line. The blocking
        // process I/O lives entirely inside spawn_blocking.
        tokio::task::spawn_blocking(move || -> Result<String, String> {
            let url = format!("https://www.youtube.com/watch?v={video_id}");
            let output = std::process::Command::new(&binary)
                .args(["-f", &format_selector, "-o", &output_path, &url])
                .output()
                .map_err(|e| e.to_string())?;

            if !output.status.success() {
                return Err(String::from_utf8_lossy(&output.stderr).to_string());
            }

            on_progress(ProgressUpdate {
                finished: true,
                filename: Some(output_path.clone()),
                ..Default::default()
            });
            Ok(output_path)
        })
        .await
        .map_err(|e| format!("download task panicked: {e}"))?
    }

    async fn extract_formats(&self, video_id: &str) -> Result<Vec<VideoFormat>, String> {
        let binary = self.binary.clone();
        let video_id = video_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<VideoFormat>, String> {
            let url = format!("https://www.youtube.com/watch?v={video_id}");
            let output = std::process::Command::new(&binary)
                .args(["-j", "--no-download", &url])
                .output()
                .map_err(|e| e.to_string())?;

            if !output.status.success() {
                return Err(String::from_utf8_lossy(&output.stderr).to_string());
            }

            let parsed: serde_json::Value =
                serde_json::from_slice(&output.stdout).map_err(|e| e.to_string())?;
            let formats = parsed
                .get("formats")
                .and_then(|f| f.as_array())
                .cloned()
                .unwrap_or_default();

            Ok(formats
                .into_iter()
                .filter_map(|f| {
                    Some(VideoFormat {
                        format_id: f.get("format_id")?.as_str()?.to_string(),
                        ext: f.get("ext")?.as_str()?.to_string(),
                        resolution: f
                            .get("resolution")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                        fps: f.get("fps").and_then(|v| v.as_u64()).map(|v| v as u32),
                        vcodec: f
                            .get("vcodec")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                        acodec: f
                            .get("acodec")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                        filesize: f.get("filesize").and_then(|v| v.as_u64()),
                        format_note: f
                            .get("format_note")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                    })
                })
                .collect())
        })
        .await
        .map_err(|e| format!("format extraction panicked: {e}"))?
    }
}
