//! Shared application state composed from the registry, storage, download,
//! and metadata clients plus the long-lived recovery manager.

use std::sync::Arc;

use yta_download::{DownloadSupervisor, YtDlpDownloader};
use yta_handlers::DownloadErrorHandler;
use yta_metadata::{MetadataClient, YoutubeDataApiClient};
use yta_recovery::{BasicErrorReporter, ErrorRecoveryManager, ExponentialBackoffStrategy};
use yta_registry::RegistryClient;
use yta_storage::{StorageClient, StorageConfig};

use crate::config::JobsConfig;
use crate::store::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<JobsConfig>,
    pub jobs: Arc<JobStore>,
    pub storage: Arc<StorageClient>,
    pub registry: Arc<RegistryClient>,
    pub download: Arc<DownloadSupervisor>,
    pub metadata: Arc<MetadataClient>,
    pub reporter: Arc<BasicErrorReporter>,
    /// Long-lived so `/api/recovery/active` can introspect in-flight retries;
    /// a manager rebuilt per call would always report empty.
    pub download_recovery: Arc<ErrorRecoveryManager>,
}

impl AppState {
    pub async fn new(config: JobsConfig) -> anyhow::Result<Self> {
        let jobs = Arc::new(JobStore::new(&config.jobs_dir).await?);

        let storage_config = StorageConfig {
            base_dir: config.storage_base_dir.clone().into(),
            recovery_plans_dir: format!("{}/recovery_plans", config.storage_base_dir).into(),
        };
        let storage = Arc::new(StorageClient::new(storage_config).await?);

        let registry = Arc::new(RegistryClient::new(&config.registry_dir).await?);

        let downloader = YtDlpDownloader::discover().map_err(|e| anyhow::anyhow!(e))?;
        let download = Arc::new(DownloadSupervisor::new(
            Arc::new(downloader),
            config.max_concurrent_downloads,
        ));

        let upstream = Arc::new(YoutubeDataApiClient::new(config.youtube_api_key.clone()));
        let metadata = Arc::new(MetadataClient::new(
            upstream,
            format!("{}/metadata", config.error_reports_dir),
        ));

        let reporter = Arc::new(BasicErrorReporter::new(config.error_reports_dir.clone()));

        let download_recovery = Arc::new(Self::build_download_recovery_manager(&reporter));

        Ok(Self {
            config: Arc::new(config),
            jobs,
            storage,
            registry,
            download,
            metadata,
            reporter,
            download_recovery,
        })
    }

    /// C1 manager bound to the download-service error handler, matching
    /// spec.md §4.3.2's "wrapped via C1 with an exponential-backoff strategy
    /// and the download-handler" for outbound download calls.
    fn build_download_recovery_manager(reporter: &Arc<BasicErrorReporter>) -> ErrorRecoveryManager {
        let cfg = yta_models::RetryConfig {
            max_attempts: 3,
            base_delay_secs: 1.0,
            ..yta_models::RetryConfig::default()
        };
        let strategy = Arc::new(ExponentialBackoffStrategy::new(cfg));
        ErrorRecoveryManager::new(
            strategy,
            Arc::clone(reporter) as Arc<dyn yta_recovery::ErrorReporter>,
            Some(Arc::new(DownloadErrorHandler) as Arc<dyn yta_recovery::ServiceErrorHandler>),
        )
    }
}
