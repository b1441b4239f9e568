//! Download-service error handler (spec.md §4.2): classifies a download
//! failure's severity and retry reason from its message and type hints.

use async_trait::async_trait;
use yta_models::{ErrorSeverity, RetryContext, RetryReason};
use yta_recovery::ServiceErrorHandler;

const NETWORK_ERROR_KEYWORDS: [&str; 11] = [
    "timeout",
    "connection",
    "network",
    "dns",
    "resolve",
    "unreachable",
    "refused",
    "reset",
    "broken pipe",
    "http error",
    "server error",
];

const YOUTUBE_ERROR_KEYWORDS: [&str; 7] = [
    "video unavailable",
    "private video",
    "deleted",
    "removed",
    "region",
    "age restricted",
    "copyright",
];

const FILESYSTEM_ERROR_KEYWORDS: [&str; 6] = [
    "permission denied",
    "disk full",
    "no space",
    "read-only",
    "file exists",
    "directory not found",
];

#[derive(Debug, Default)]
pub struct DownloadErrorHandler;

impl DownloadErrorHandler {
    pub fn new() -> Self {
        Self
    }

    fn matches_any(message: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| message.contains(k))
    }
}

#[async_trait]
impl ServiceErrorHandler for DownloadErrorHandler {
    async fn handle_error(&self, message: &str, _context: &RetryContext) -> bool {
        let lower = message.to_lowercase();

        if lower.contains("disk full") || lower.contains("no space") {
            tracing::info!("handled download error: disk_space_warning");
            return true;
        }
        if Self::matches_any(&lower, &NETWORK_ERROR_KEYWORDS) {
            tracing::info!("handled download error: network_diagnostics");
            return true;
        }
        if Self::matches_any(&lower, &FILESYSTEM_ERROR_KEYWORDS) {
            tracing::info!("handled download error: filesystem_issue");
            return true;
        }
        if Self::matches_any(&lower, &YOUTUBE_ERROR_KEYWORDS) {
            tracing::info!("handled download error: youtube_error_classification (no retry)");
            return false;
        }

        tracing::warn!(message = %message, "unhandled download error");
        false
    }

    fn get_recovery_suggestions(&self, message: &str) -> Vec<String> {
        let lower = message.to_lowercase();

        if lower.contains("disk full") || lower.contains("no space") {
            return vec![
                "Check available disk space in output directory".to_string(),
                "Consider cleaning up old downloads".to_string(),
                "Move downloads to a different location with more space".to_string(),
            ];
        }
        if Self::matches_any(&lower, &NETWORK_ERROR_KEYWORDS) {
            return vec![
                "Check internet connectivity".to_string(),
                "Try a different network connection".to_string(),
                "Verify YouTube is accessible from your location".to_string(),
            ];
        }
        if Self::matches_any(&lower, &YOUTUBE_ERROR_KEYWORDS) {
            return vec![
                "Verify the video URL is correct and accessible".to_string(),
                "Check if the video is available in your region".to_string(),
                "Try accessing the video in a web browser".to_string(),
            ];
        }

        vec![
            "Check logs for more details".to_string(),
            "Retry the operation".to_string(),
        ]
    }

    fn should_retry(&self, message: &str, context: &RetryContext) -> bool {
        let lower = message.to_lowercase();

        if Self::matches_any(&lower, &YOUTUBE_ERROR_KEYWORDS) {
            tracing::info!(message = %message, "permanent YouTube error, not retrying");
            return false;
        }
        if lower.contains("permission denied") || lower.contains("read-only") {
            tracing::info!(message = %message, "filesystem permission error, not retrying");
            return false;
        }
        if Self::matches_any(&lower, &NETWORK_ERROR_KEYWORDS) {
            return true;
        }
        if lower.contains("disk full") || lower.contains("no space") {
            return true;
        }
        context.attempt_count < 2
    }

    fn get_error_severity(&self, message: &str, _context: &RetryContext) -> ErrorSeverity {
        let lower = message.to_lowercase();

        if lower.contains("corrupted") || lower.contains("invalid format") {
            return ErrorSeverity::Critical;
        }
        if Self::matches_any(&lower, &YOUTUBE_ERROR_KEYWORDS) {
            return ErrorSeverity::High;
        }
        if lower.contains("permission denied") || lower.contains("readonly") {
            return ErrorSeverity::High;
        }
        if Self::matches_any(&lower, &NETWORK_ERROR_KEYWORDS) {
            return ErrorSeverity::Medium;
        }
        if lower.contains("disk full") || lower.contains("no space") {
            return ErrorSeverity::Medium;
        }
        ErrorSeverity::Medium
    }

    fn get_retry_reason(&self, message: &str, _context: &RetryContext) -> Option<RetryReason> {
        let lower = message.to_lowercase();

        if lower.contains("rate limit") || lower.contains("too many requests") {
            return Some(RetryReason::RateLimited);
        }
        if lower.contains("no space left") || lower.contains("disk full") || lower.contains("out of memory") {
            return Some(RetryReason::ResourceExhausted);
        }
        if lower.contains("request timeout") || lower.contains("timeout after") {
            return Some(RetryReason::Timeout);
        }
        if lower.contains("http error 5") || lower.contains("service unavailable") || lower.contains("server error") {
            return Some(RetryReason::ServerError);
        }
        if Self::matches_any(&lower, &NETWORK_ERROR_KEYWORDS) {
            return Some(RetryReason::NetworkError);
        }
        Some(RetryReason::Unknown)
    }

    async fn cleanup_after_failure(&self, context: &RetryContext) -> bool {
        let Some(output_path) = context
            .operation_context
            .get("output_path")
            .and_then(|v| v.as_str())
        else {
            return false;
        };
        let Some(video_id) = context.video_id.as_deref() else {
            tracing::warn!("no video_id in context, cannot perform cleanup");
            return false;
        };

        let dir = std::path::Path::new(output_path);
        let mut found_any = false;
        let mut cleaned = Vec::new();

        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return false;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let ext_matches = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("part") | Some("tmp")
            );
            if !ext_matches {
                continue;
            }
            found_any = true;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => cleaned.push(path),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not clean up file"),
            }
        }

        if !cleaned.is_empty() {
            tracing::info!(video_id, count = cleaned.len(), "cleaned up partial download files");
            true
        } else {
            let _ = found_any;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx_with_output(dir: &std::path::Path, video_id: &str) -> RetryContext {
        let mut operation_context = HashMap::new();
        operation_context.insert(
            "output_path".to_string(),
            serde_json::Value::String(dir.to_string_lossy().to_string()),
        );
        RetryContext {
            video_id: Some(video_id.to_string()),
            operation_context,
            ..RetryContext::new("download")
        }
    }

    #[test]
    fn youtube_permanent_errors_are_not_retried() {
        let handler = DownloadErrorHandler::new();
        let ctx = RetryContext::new("download");
        assert!(!handler.should_retry("Video unavailable: private video", &ctx));
    }

    #[test]
    fn network_errors_are_retried() {
        let handler = DownloadErrorHandler::new();
        let ctx = RetryContext::new("download");
        assert!(handler.should_retry("Connection reset by peer", &ctx));
    }

    #[test]
    fn unknown_errors_retry_once_then_stop() {
        let handler = DownloadErrorHandler::new();
        let mut ctx = RetryContext::new("download");
        ctx.attempt_count = 0;
        assert!(handler.should_retry("something odd happened", &ctx));
        ctx.attempt_count = 2;
        assert!(!handler.should_retry("something odd happened", &ctx));
    }

    #[test]
    fn severity_is_high_for_youtube_errors() {
        let handler = DownloadErrorHandler::new();
        let ctx = RetryContext::new("download");
        assert_eq!(
            handler.get_error_severity("video unavailable", &ctx),
            ErrorSeverity::High
        );
    }

    #[test]
    fn retry_reason_detects_rate_limit() {
        let handler = DownloadErrorHandler::new();
        let ctx = RetryContext::new("download");
        assert_eq!(
            handler.get_retry_reason("rate limit exceeded", &ctx),
            Some(RetryReason::RateLimited)
        );
    }

    #[tokio::test]
    async fn handle_error_accepts_network_issues() {
        let handler = DownloadErrorHandler::new();
        let ctx = RetryContext::new("download");
        assert!(handler.handle_error("connection timed out", &ctx).await);
    }

    #[tokio::test]
    async fn handle_error_refuses_youtube_permanent_errors() {
        let handler = DownloadErrorHandler::new();
        let ctx = RetryContext::new("download");
        assert!(!handler.handle_error("video unavailable", &ctx).await);
    }

    #[tokio::test]
    async fn cleanup_removes_part_and_tmp_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.part"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("b.tmp"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("c.mp4"), b"x").await.unwrap();

        let handler = DownloadErrorHandler::new();
        let ctx = ctx_with_output(dir.path(), "abc123");
        assert!(handler.cleanup_after_failure(&ctx).await);

        assert!(!dir.path().join("a.part").exists());
        assert!(!dir.path().join("b.tmp").exists());
        assert!(dir.path().join("c.mp4").exists());
    }

    #[tokio::test]
    async fn cleanup_without_video_id_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DownloadErrorHandler::new();
        let mut operation_context = HashMap::new();
        operation_context.insert(
            "output_path".to_string(),
            serde_json::Value::String(dir.path().to_string_lossy().to_string()),
        );
        let ctx = RetryContext {
            operation_context,
            ..RetryContext::new("download")
        };
        assert!(!handler.cleanup_after_failure(&ctx).await);
    }
}
