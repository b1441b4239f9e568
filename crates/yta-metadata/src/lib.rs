//! C6: metadata supervisor. Quota-guarded upstream fetch, TTL cache, and
//! chunked batch fetch over the YouTube Data API.

pub mod cache;
pub mod client;
pub mod error;
pub mod quota;
pub mod upstream;

pub use client::{BatchFetchResult, MetadataClient};
pub use error::{MetadataError, MetadataResult};
pub use quota::{QuotaTracker, COST_BATCH_CHUNK, COST_PLAYLIST, COST_VIDEO, QUOTA_LIMIT, QUOTA_RESERVE};
pub use upstream::{UpstreamClient, YoutubeDataApiClient};
