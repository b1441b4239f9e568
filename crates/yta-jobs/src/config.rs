//! Orchestrator configuration, loaded from the environment.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub host: String,
    pub port: u16,
    pub jobs_dir: String,
    pub playlist_results_dir: String,
    pub registry_dir: String,
    pub storage_base_dir: String,
    pub error_reports_dir: String,
    pub max_concurrent_downloads: usize,
    pub playlist_chunk_size: usize,
    pub playlist_large_threshold: usize,
    pub playlist_max_concurrent_ceiling: usize,
    pub youtube_api_key: String,
    pub request_timeout: Duration,
    pub environment: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),
}

impl JobsConfig {
    /// Build configuration from the environment. Fails fast on a missing
    /// YouTube API key per spec.md §6.
    pub fn from_env() -> Result<Self, ConfigError> {
        let youtube_api_key = std::env::var("YOUTUBE_API_KEY")
            .or_else(|_| std::env::var("YTA_METADATA_API_KEY"))
            .map_err(|_| ConfigError::MissingRequired("YOUTUBE_API_KEY or YTA_METADATA_API_KEY"))?;

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8010),
            jobs_dir: std::env::var("YTA_JOBS_DIR").unwrap_or_else(|_| "./data/jobs".to_string()),
            playlist_results_dir: std::env::var("YTA_PLAYLIST_RESULTS_DIR")
                .unwrap_or_else(|_| "./data/playlist_results".to_string()),
            registry_dir: std::env::var("YTA_REGISTRY_DIR")
                .unwrap_or_else(|_| "./data/registry".to_string()),
            storage_base_dir: std::env::var("YTA_STORAGE_BASE_DIR")
                .unwrap_or_else(|_| "./data/storage".to_string()),
            error_reports_dir: std::env::var("YTA_ERROR_REPORTS_DIR")
                .unwrap_or_else(|_| "./data/errors".to_string()),
            max_concurrent_downloads: std::env::var("YTA_MAX_CONCURRENT_DOWNLOADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            playlist_chunk_size: std::env::var("YTA_PLAYLIST_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(25),
            playlist_large_threshold: std::env::var("YTA_PLAYLIST_LARGE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            playlist_max_concurrent_ceiling: std::env::var("YTA_PLAYLIST_MAX_CONCURRENCY_CEILING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            youtube_api_key,
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: env vars are process-global, so exercising both branches
    // in one test avoids cross-test races under the default parallel runner.
    #[test]
    fn api_key_presence_gates_construction() {
        std::env::remove_var("YOUTUBE_API_KEY");
        std::env::remove_var("YTA_METADATA_API_KEY");
        assert!(matches!(
            JobsConfig::from_env(),
            Err(ConfigError::MissingRequired(_))
        ));

        std::env::set_var("YOUTUBE_API_KEY", "test-key");
        let config = JobsConfig::from_env().unwrap();
        assert_eq!(config.youtube_api_key, "test-key");
        std::env::remove_var("YOUTUBE_API_KEY");
    }
}
