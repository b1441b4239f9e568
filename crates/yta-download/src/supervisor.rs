//! Download supervisor (C5): task table, bounded-concurrency workers,
//! progress tracking, cooperative cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tracing::{info, warn};

use yta_models::{
    AvailableFormats, DownloadProgress, DownloadRequest, DownloadStatus, DownloadTask, Quality,
    RetryConfig, RetryContext, TaskId,
};
use yta_recovery::{
    shared, BasicErrorReporter, ErrorRecoveryManager, ExponentialBackoffStrategy, RecoverableError,
};

use crate::downloader::{ProgressUpdate, VideoDownloader};
use crate::error::{DownloadError, DownloadResult};
use crate::quality::format_selector;

struct WorkerHandle {
    cancel: watch::Sender<bool>,
}

/// Wraps the downloader's stringly-typed failures so they can travel
/// through `ExecuteWithRetry`.
#[derive(Debug)]
struct DownloaderError(String);

impl std::fmt::Display for DownloaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RecoverableError for DownloaderError {
    fn exception_type(&self) -> &'static str {
        "DownloaderError"
    }
}

pub struct DownloadSupervisor {
    downloader: Arc<dyn VideoDownloader>,
    semaphore: Arc<Semaphore>,
    tasks: RwLock<HashMap<String, DownloadTask>>,
    progress: RwLock<HashMap<String, DownloadProgress>>,
    workers: Mutex<HashMap<String, WorkerHandle>>,
    formats_recovery: ErrorRecoveryManager,
}

impl DownloadSupervisor {
    pub fn new(downloader: Arc<dyn VideoDownloader>, max_concurrent_downloads: usize) -> Self {
        let retry_config = RetryConfig {
            max_attempts: 3,
            base_delay_secs: 1.0,
            ..RetryConfig::default()
        };
        let strategy = shared(ExponentialBackoffStrategy::new(retry_config));
        let reporter = Arc::new(BasicErrorReporter::new("./data/download_errors"));
        let formats_recovery = ErrorRecoveryManager::new(strategy, reporter, None);

        Self {
            downloader,
            semaphore: Arc::new(Semaphore::new(max_concurrent_downloads)),
            tasks: RwLock::new(HashMap::new()),
            progress: RwLock::new(HashMap::new()),
            workers: Mutex::new(HashMap::new()),
            formats_recovery,
        }
    }

    pub async fn start_download(
        self: &Arc<Self>,
        request: DownloadRequest,
    ) -> DownloadResult<DownloadTask> {
        let quality = Quality::parse(&request.quality)
            .ok_or_else(|| DownloadError::UnknownQuality(request.quality.clone()))?;

        tokio::fs::create_dir_all(&request.output_path).await?;

        let task_id = TaskId::new();
        let now = Utc::now();
        let task = DownloadTask {
            task_id: task_id.clone(),
            video_id: request.video_id.clone(),
            status: DownloadStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            output_path: request.output_path.clone(),
            file_path: None,
            error: None,
            quality: request.quality.clone(),
        };

        self.tasks
            .write()
            .await
            .insert(task_id.as_str().to_string(), task.clone());
        self.progress.write().await.insert(
            task_id.as_str().to_string(),
            DownloadProgress::pending(task_id.clone(), request.video_id.clone()),
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.workers
            .lock()
            .await
            .insert(task_id.as_str().to_string(), WorkerHandle { cancel: cancel_tx });

        let supervisor = Arc::clone(self);
        let selector = format_selector(quality).to_string();
        tokio::spawn(async move {
            supervisor.run_worker(task_id, request, selector, cancel_rx).await;
        });

        Ok(task)
    }

    async fn run_worker(
        self: Arc<Self>,
        task_id: TaskId,
        request: DownloadRequest,
        selector: String,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        let _permit = self.semaphore.acquire().await;
        let key = task_id.as_str().to_string();

        if *cancel_rx.borrow() {
            self.workers.lock().await.remove(&key);
            return;
        }

        self.set_status(&key, DownloadStatus::Downloading, |t| {
            t.started_at = Some(Utc::now());
        })
        .await;

        let self_for_cb = Arc::clone(&self);
        let key_for_cb = key.clone();
        let on_progress: crate::downloader::ProgressCallback = Box::new(move |update: ProgressUpdate| {
            let self_cb = Arc::clone(&self_for_cb);
            let key_cb = key_for_cb.clone();
            tokio::spawn(async move {
                self_cb.apply_progress(&key_cb, update).await;
            });
        });

        tokio::select! {
            result = self.downloader.download(&request.video_id, &selector, &request.output_path, on_progress) => {
                match result {
                    Ok(file_path) => {
                        self.set_status(&key, DownloadStatus::Completed, |t| {
                            t.completed_at = Some(Utc::now());
                            t.file_path = Some(file_path.clone());
                        })
                        .await;
                        self.finish_progress(&key, DownloadStatus::Completed, Some(file_path), None)
                            .await;
                        info!(task_id = %key, "download completed");
                    }
                    Err(err) => {
                        self.set_status(&key, DownloadStatus::Failed, |t| {
                            t.error = Some(err.clone());
                        })
                        .await;
                        self.finish_progress(&key, DownloadStatus::Failed, None, Some(err.clone()))
                            .await;
                        warn!(task_id = %key, error = %err, "download failed");
                    }
                }
            }
            _ = cancel_rx.changed() => {
                self.set_status(&key, DownloadStatus::Cancelled, |_| {}).await;
                self.finish_progress(&key, DownloadStatus::Cancelled, None, None).await;
                info!(task_id = %key, "download cancelled");
            }
        }

        self.workers.lock().await.remove(&key);
    }

    async fn set_status(&self, key: &str, status: DownloadStatus, mutate: impl FnOnce(&mut DownloadTask)) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(key) {
            task.status = status;
            mutate(task);
        }
    }

    async fn apply_progress(&self, key: &str, update: ProgressUpdate) {
        let mut progress_map = self.progress.write().await;
        let Some(progress) = progress_map.get_mut(key) else {
            return;
        };
        progress.downloaded_bytes = update.downloaded_bytes;
        progress.total_bytes = update.total_bytes;
        progress.speed = update.speed;
        progress.eta = update.eta;
        if let Some(total) = update.total_bytes {
            if total > 0 {
                progress.progress_percent = (update.downloaded_bytes as f64 / total as f64) * 100.0;
            }
        }
        if update.finished {
            progress.file_path = update.filename;
        }
    }

    async fn finish_progress(
        &self,
        key: &str,
        status: DownloadStatus,
        file_path: Option<String>,
        error: Option<String>,
    ) {
        let mut progress_map = self.progress.write().await;
        if let Some(progress) = progress_map.get_mut(key) {
            progress.status = status;
            if status == DownloadStatus::Completed {
                progress.progress_percent = 100.0;
            }
            if file_path.is_some() {
                progress.file_path = file_path;
            }
            progress.error = error;
        }
    }

    pub async fn cancel(&self, task_id: &str) -> DownloadResult<()> {
        let is_terminal = {
            let tasks = self.tasks.read().await;
            let task = tasks
                .get(task_id)
                .ok_or_else(|| DownloadError::TaskNotFound(task_id.to_string()))?;
            task.status.is_terminal()
        };
        if is_terminal {
            return Err(DownloadError::TaskAlreadyTerminal(task_id.to_string()));
        }

        let mut workers = self.workers.lock().await;
        if let Some(handle) = workers.remove(task_id) {
            let _ = handle.cancel.send(true);
        }
        Ok(())
    }

    pub async fn progress(&self, task_id: &str) -> DownloadResult<DownloadProgress> {
        self.progress
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| DownloadError::TaskNotFound(task_id.to_string()))
    }

    pub async fn formats(&self, video_id: &str) -> DownloadResult<AvailableFormats> {
        let ctx = RetryContext::new("get_formats").with_video_id(video_id);
        let formats = self
            .formats_recovery
            .execute_with_retry("get_formats", ctx, || async {
                self.downloader
                    .extract_formats(video_id)
                    .await
                    .map_err(DownloaderError)
            })
            .await
            .map_err(|e| DownloadError::Downloader(e.0))?;
        if formats.is_empty() {
            return Err(DownloadError::Downloader(format!(
                "no formats found for {video_id}"
            )));
        }
        let best_format = formats
            .iter()
            .max_by_key(|f| f.filesize.unwrap_or(0))
            .map(|f| f.format_id.clone())
            .unwrap_or_default();
        Ok(AvailableFormats {
            video_id: video_id.to_string(),
            formats,
            best_format,
        })
    }

    /// Cancel all live workers and await their completion; used at shutdown
    /// and in tests.
    pub async fn cleanup_pending_tasks(&self) {
        let ids: Vec<String> = self.workers.lock().await.keys().cloned().collect();
        for id in ids {
            let _ = self.cancel(&id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use yta_models::VideoFormat;

    struct FakeDownloader {
        fail: bool,
        slow: bool,
    }

    #[async_trait]
    impl VideoDownloader for FakeDownloader {
        async fn download(
            &self,
            _video_id: &str,
            _format_selector: &str,
            output_path: &str,
            on_progress: crate::downloader::ProgressCallback,
        ) -> Result<String, String> {
            if self.slow {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
            if self.fail {
                return Err("video unavailable: private video".to_string());
            }
            on_progress(ProgressUpdate {
                downloaded_bytes: 100,
                total_bytes: Some(100),
                finished: true,
                filename: Some(format!("{output_path}/done.mp4")),
                ..Default::default()
            });
            Ok(format!("{output_path}/done.mp4"))
        }

        async fn extract_formats(&self, video_id: &str) -> Result<Vec<VideoFormat>, String> {
            Ok(vec![VideoFormat {
                format_id: "137".to_string(),
                ext: "mp4".to_string(),
                resolution: Some("1920x1080".to_string()),
                fps: Some(30),
                vcodec: Some("avc1".to_string()),
                acodec: None,
                filesize: Some(1024),
                format_note: None,
            }])
            .map(|v| {
                let _ = video_id;
                v
            })
        }
    }

    fn request(dir: &std::path::Path) -> DownloadRequest {
        DownloadRequest {
            video_id: "abc123".to_string(),
            quality: "720p".to_string(),
            output_path: dir.to_string_lossy().to_string(),
            include_captions: false,
            caption_languages: vec![],
            resume: false,
            job_id: None,
        }
    }

    #[tokio::test]
    async fn rejects_unknown_quality() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: false }),
            3,
        ));
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path());
        req.quality = "4k".to_string();
        let err = supervisor.start_download(req).await.unwrap_err();
        assert!(matches!(err, DownloadError::UnknownQuality(_)));
    }

    #[tokio::test]
    async fn successful_download_reaches_completed() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: false }),
            3,
        ));
        let dir = tempfile::tempdir().unwrap();
        let task = supervisor.start_download(request(dir.path())).await.unwrap();

        for _ in 0..20 {
            let progress = supervisor.progress(task.task_id.as_str()).await.unwrap();
            if progress.status == DownloadStatus::Completed {
                assert_eq!(progress.progress_percent, 100.0);
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("download never completed");
    }

    #[tokio::test]
    async fn failed_download_reaches_failed_with_error() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: true, slow: false }),
            3,
        ));
        let dir = tempfile::tempdir().unwrap();
        let task = supervisor.start_download(request(dir.path())).await.unwrap();

        for _ in 0..20 {
            let progress = supervisor.progress(task.task_id.as_str()).await.unwrap();
            if progress.status == DownloadStatus::Failed {
                assert!(progress.error.is_some());
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("download never failed");
    }

    #[tokio::test]
    async fn cancel_unknown_task_is_not_found() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: false }),
            3,
        ));
        let err = supervisor.cancel("ghost").await.unwrap_err();
        assert!(matches!(err, DownloadError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn cancel_in_flight_task_transitions_to_cancelled() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: true }),
            3,
        ));
        let dir = tempfile::tempdir().unwrap();
        let task = supervisor.start_download(request(dir.path())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        supervisor.cancel(task.task_id.as_str()).await.unwrap();

        for _ in 0..30 {
            let progress = supervisor.progress(task.task_id.as_str()).await.unwrap();
            if progress.status == DownloadStatus::Cancelled {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("task never reached cancelled");
    }

    #[tokio::test]
    async fn double_cancel_of_terminal_task_is_rejected() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: false }),
            3,
        ));
        let dir = tempfile::tempdir().unwrap();
        let task = supervisor.start_download(request(dir.path())).await.unwrap();

        loop {
            let progress = supervisor.progress(task.task_id.as_str()).await.unwrap();
            if progress.status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let err = supervisor.cancel(task.task_id.as_str()).await.unwrap_err();
        assert!(matches!(err, DownloadError::TaskAlreadyTerminal(_)));
    }

    #[tokio::test]
    async fn formats_returns_best_by_filesize() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: false }),
            3,
        ));
        let formats = supervisor.formats("abc123").await.unwrap();
        assert_eq!(formats.best_format, "137");
    }

    #[tokio::test]
    async fn cleanup_pending_tasks_cancels_everything() {
        let supervisor = Arc::new(DownloadSupervisor::new(
            Arc::new(FakeDownloader { fail: false, slow: true }),
            3,
        ));
        let dir = tempfile::tempdir().unwrap();
        let _ = supervisor.start_download(request(dir.path())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        supervisor.cleanup_pending_tasks().await;
        assert!(supervisor.workers.lock().await.is_empty());
    }
}
