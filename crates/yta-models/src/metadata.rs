//! Metadata-supervisor record shapes (C6): parsed video/playlist metadata,
//! cache entries, and quota accounting.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlaylistVideoEntry {
    pub video_id: String,
    pub title: String,
    pub position: u32,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlaylistMetadata {
    pub playlist_id: String,
    pub title: String,
    pub channel_id: String,
    pub video_count: u32,
    pub videos: Vec<PlaylistVideoEntry>,
}

/// A cached value with an absolute expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl_secs: i64) -> Self {
        Self {
            data,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct QuotaStatus {
    pub quota_limit: u64,
    pub quota_used: u64,
    pub quota_reserve: u64,
    pub quota_reset_time: DateTime<Utc>,
    pub operations_available: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_entry_expires_after_ttl() {
        let entry = CacheEntry::new("v", -1);
        assert!(entry.is_expired());
        let fresh = CacheEntry::new("v", 3600);
        assert!(!fresh.is_expired());
    }
}
