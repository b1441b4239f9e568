use thiserror::Error;

pub type DownloadResult<T> = Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("unknown quality: {0}")]
    UnknownQuality(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task is already terminal: {0}")]
    TaskAlreadyTerminal(String),

    #[error("downloader failed: {0}")]
    Downloader(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
