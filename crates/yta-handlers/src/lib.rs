//! C2: service-specific `ServiceErrorHandler` implementations.

pub mod download;

pub use download::DownloadErrorHandler;
