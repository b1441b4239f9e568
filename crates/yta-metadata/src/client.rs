//! `MetadataClient` (C6): cache-first, quota-guarded metadata fetch wrapping
//! the upstream call in the exponential-backoff retry driver.

use std::path::PathBuf;
use std::sync::Arc;

use yta_models::{PlaylistMetadata, QuotaStatus, RetryConfig, RetryContext, VideoMetadata};
use yta_recovery::{BasicErrorReporter, ErrorRecoveryManager, ExponentialBackoffStrategy, RecoverableError};

use crate::cache::TtlCache;
use crate::error::{MetadataError, MetadataResult};
use crate::quota::{QuotaTracker, COST_BATCH_CHUNK, COST_PLAYLIST, COST_VIDEO};
use crate::upstream::UpstreamClient;

const VIDEO_CACHE_TTL_SECS: i64 = 3600;
const PLAYLIST_CACHE_TTL_SECS: i64 = 1800;
const BATCH_CHUNK_SIZE: usize = 50;
const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug)]
struct WrappedUpstreamError(String);

impl std::fmt::Display for WrappedUpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RecoverableError for WrappedUpstreamError {
    fn exception_type(&self) -> &'static str {
        "MetadataUpstreamError"
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchFetchResult {
    pub videos: Vec<VideoMetadata>,
    pub failed: Vec<String>,
}

pub struct MetadataClient {
    upstream: Arc<dyn UpstreamClient>,
    video_cache: TtlCache<VideoMetadata>,
    playlist_cache: TtlCache<PlaylistMetadata>,
    quota: QuotaTracker,
    recovery: ErrorRecoveryManager,
}

impl MetadataClient {
    pub fn new(upstream: Arc<dyn UpstreamClient>, error_log_dir: impl Into<PathBuf>) -> Self {
        let cfg = RetryConfig {
            max_attempts: 3,
            base_delay_secs: 1.0,
            ..RetryConfig::default()
        };
        let strategy = Arc::new(ExponentialBackoffStrategy::new(cfg));
        let reporter = Arc::new(BasicErrorReporter::new(error_log_dir.into()));
        Self {
            upstream,
            video_cache: TtlCache::new(),
            playlist_cache: TtlCache::new(),
            quota: QuotaTracker::new(),
            recovery: ErrorRecoveryManager::new(strategy, reporter, None),
        }
    }

    pub async fn get_video_metadata(&self, video_id: &str) -> MetadataResult<VideoMetadata> {
        if let Some(cached) = self.video_cache.get(video_id) {
            return Ok(cached);
        }
        self.quota.check_and_reserve(COST_VIDEO)?;

        let context = RetryContext::new("get_video_metadata").with_video_id(video_id);
        let metadata = self
            .recovery
            .execute_with_retry("get_video_metadata", context, || async {
                self.upstream
                    .fetch_video(video_id)
                    .await
                    .map_err(|e| WrappedUpstreamError(e.to_string()))
            })
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;

        self.video_cache
            .insert(video_id.to_string(), metadata.clone(), VIDEO_CACHE_TTL_SECS);
        Ok(metadata)
    }

    pub async fn get_playlist_metadata(&self, playlist_id: &str) -> MetadataResult<PlaylistMetadata> {
        if let Some(cached) = self.playlist_cache.get(playlist_id) {
            return Ok(cached);
        }
        self.quota.check_and_reserve(COST_PLAYLIST)?;

        let context = RetryContext::new("get_playlist_metadata")
            .with_operation_context_entry("playlist_id", serde_json::json!(playlist_id));
        let metadata = self
            .recovery
            .execute_with_retry("get_playlist_metadata", context, || async {
                self.upstream
                    .fetch_playlist(playlist_id)
                    .await
                    .map_err(|e| WrappedUpstreamError(e.to_string()))
            })
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;

        self.playlist_cache.insert(
            playlist_id.to_string(),
            metadata.clone(),
            PLAYLIST_CACHE_TTL_SECS,
        );
        Ok(metadata)
    }

    /// Fetch metadata for up to [`MAX_BATCH_SIZE`] video ids in chunks of
    /// [`BATCH_CHUNK_SIZE`]. Quota exhaustion mid-chunk adds every remaining
    /// id (including the rest of the in-flight chunk) to `failed` and stops;
    /// a parse/upstream failure for a single id also lands it in `failed`
    /// without aborting the batch.
    pub async fn batch_fetch(&self, video_ids: &[String]) -> MetadataResult<BatchFetchResult> {
        if video_ids.is_empty() || video_ids.len() > MAX_BATCH_SIZE {
            return Err(MetadataError::Upstream(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                video_ids.len()
            )));
        }

        let mut result = BatchFetchResult::default();

        'chunks: for chunk in video_ids.chunks(BATCH_CHUNK_SIZE) {
            if self.quota.check_and_reserve(COST_BATCH_CHUNK).is_err() {
                result.failed.extend(chunk.iter().cloned());
                continue;
            }

            for id in chunk {
                if let Some(cached) = self.video_cache.get(id) {
                    result.videos.push(cached);
                    continue;
                }
                match self.get_video_metadata(id).await {
                    Ok(metadata) => result.videos.push(metadata),
                    Err(MetadataError::QuotaExceeded) => {
                        result.failed.push(id.clone());
                        let remaining_in_chunk: Vec<String> = chunk
                            .iter()
                            .skip_while(|v| *v != id)
                            .skip(1)
                            .cloned()
                            .collect();
                        result.failed.extend(remaining_in_chunk);
                        break 'chunks;
                    }
                    Err(_) => result.failed.push(id.clone()),
                }
            }
        }

        Ok(result)
    }

    pub fn quota_status(&self) -> QuotaStatus {
        self.quota.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FakeUpstream {
        video_calls: AtomicU32,
        fail_ids: Mutex<Vec<String>>,
    }

    impl FakeUpstream {
        fn new() -> Self {
            Self {
                video_calls: AtomicU32::new(0),
                fail_ids: Mutex::new(Vec::new()),
            }
        }

        fn failing(ids: &[&str]) -> Self {
            Self {
                video_calls: AtomicU32::new(0),
                fail_ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl UpstreamClient for FakeUpstream {
        async fn fetch_video(&self, video_id: &str) -> MetadataResult<VideoMetadata> {
            self.video_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.lock().unwrap().contains(&video_id.to_string()) {
                return Err(MetadataError::NotFound(video_id.to_string()));
            }
            Ok(VideoMetadata {
                video_id: video_id.to_string(),
                title: "Title".into(),
                description: None,
                channel_id: "chan".into(),
                channel_title: "Chan".into(),
                published_at: chrono::Utc::now(),
                duration_seconds: 120,
                view_count: Some(10),
                is_available: true,
            })
        }

        async fn fetch_playlist(&self, playlist_id: &str) -> MetadataResult<PlaylistMetadata> {
            Ok(PlaylistMetadata {
                playlist_id: playlist_id.to_string(),
                title: "Playlist".into(),
                channel_id: "chan".into(),
                video_count: 0,
                videos: vec![],
            })
        }
    }

    fn client(upstream: FakeUpstream) -> MetadataClient {
        let dir = tempfile::tempdir().unwrap();
        MetadataClient::new(Arc::new(upstream), dir.path().to_path_buf())
    }

    #[tokio::test]
    async fn second_fetch_hits_cache_not_upstream() {
        let upstream = FakeUpstream::new();
        let client = client(upstream);
        client.get_video_metadata("abc").await.unwrap();
        client.get_video_metadata("abc").await.unwrap();
        assert_eq!(client.quota_status().quota_used, COST_VIDEO);
    }

    #[tokio::test]
    async fn playlist_fetch_costs_two_units() {
        let upstream = FakeUpstream::new();
        let client = client(upstream);
        client.get_playlist_metadata("PL1").await.unwrap();
        assert_eq!(client.quota_status().quota_used, COST_PLAYLIST);
    }

    #[tokio::test]
    async fn batch_fetch_splits_failures_from_successes() {
        let upstream = FakeUpstream::failing(&["bad1"]);
        let client = client(upstream);
        let ids = vec!["good1".to_string(), "bad1".to_string(), "good2".to_string()];
        let result = client.batch_fetch(&ids).await.unwrap();
        assert_eq!(result.videos.len(), 2);
        assert_eq!(result.failed, vec!["bad1".to_string()]);
    }

    #[tokio::test]
    async fn batch_fetch_rejects_oversized_batch() {
        let upstream = FakeUpstream::new();
        let client = client(upstream);
        let ids: Vec<String> = (0..51).map(|i| format!("id{i}")).collect();
        assert!(matches!(
            client.batch_fetch(&ids).await,
            Err(MetadataError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn batch_fetch_rejects_empty_batch() {
        let upstream = FakeUpstream::new();
        let client = client(upstream);
        assert!(client.batch_fetch(&[]).await.is_err());
    }

    #[tokio::test]
    async fn quota_status_reflects_fetches() {
        let upstream = FakeUpstream::new();
        let client = client(upstream);
        client.get_video_metadata("abc").await.unwrap();
        let status = client.quota_status();
        assert_eq!(status.quota_used, COST_VIDEO);
        assert_eq!(status.quota_limit, crate::quota::QUOTA_LIMIT);
    }
}
