//! Abstraction over the YouTube Data API so `MetadataClient` can be tested
//! without network access, mirroring `yta-download`'s `VideoDownloader`
//! split between trait and real implementation.

use async_trait::async_trait;
use yta_models::{parse_iso8601_duration, PlaylistMetadata, PlaylistVideoEntry, VideoMetadata};

use crate::error::{MetadataError, MetadataResult};

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_video(&self, video_id: &str) -> MetadataResult<VideoMetadata>;
    async fn fetch_playlist(&self, playlist_id: &str) -> MetadataResult<PlaylistMetadata>;
}

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub struct YoutubeDataApiClient {
    http: reqwest::Client,
    api_key: String,
}

impl YoutubeDataApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn status_to_error(status: reqwest::StatusCode, context: &str) -> MetadataError {
        match status.as_u16() {
            403 => MetadataError::Forbidden(context.to_string()),
            404 => MetadataError::NotFound(context.to_string()),
            other => MetadataError::Upstream(format!("upstream returned {other} for {context}")),
        }
    }
}

#[async_trait]
impl UpstreamClient for YoutubeDataApiClient {
    async fn fetch_video(&self, video_id: &str) -> MetadataResult<VideoMetadata> {
        let url = format!(
            "{API_BASE}/videos?part=snippet,contentDetails,statistics&id={video_id}&key={}",
            self.api_key
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_to_error(response.status(), video_id));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;

        let item = body
            .get("items")
            .and_then(|items| items.get(0))
            .ok_or_else(|| MetadataError::NotFound(video_id.to_string()))?;

        parse_video_item(item)
    }

    async fn fetch_playlist(&self, playlist_id: &str) -> MetadataResult<PlaylistMetadata> {
        let url = format!(
            "{API_BASE}/playlists?part=snippet,contentDetails&id={playlist_id}&key={}",
            self.api_key
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::status_to_error(response.status(), playlist_id));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;
        let item = body
            .get("items")
            .and_then(|items| items.get(0))
            .ok_or_else(|| MetadataError::NotFound(playlist_id.to_string()))?;

        let title = item["snippet"]["title"].as_str().unwrap_or_default().to_string();
        let channel_id = item["snippet"]["channelId"].as_str().unwrap_or_default().to_string();
        let video_count = item["contentDetails"]["itemCount"].as_u64().unwrap_or(0) as u32;

        let items_url = format!(
            "{API_BASE}/playlistItems?part=snippet&playlistId={playlist_id}&maxResults=50&key={}",
            self.api_key
        );
        let items_response = self
            .http
            .get(&items_url)
            .send()
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;
        if !items_response.status().is_success() {
            return Err(Self::status_to_error(items_response.status(), playlist_id));
        }
        let items_body: serde_json::Value = items_response
            .json()
            .await
            .map_err(|e| MetadataError::Upstream(e.to_string()))?;

        let videos = items_body
            .get("items")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .enumerate()
                    .map(|(position, entry)| {
                        let title = entry["snippet"]["title"].as_str().unwrap_or_default().to_string();
                        let video_id = entry["snippet"]["resourceId"]["videoId"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string();
                        let is_available = title != "Private video";
                        PlaylistVideoEntry {
                            video_id,
                            title,
                            position: position as u32,
                            is_available,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(PlaylistMetadata {
            playlist_id: playlist_id.to_string(),
            title,
            channel_id,
            video_count,
            videos,
        })
    }
}

fn parse_video_item(item: &serde_json::Value) -> MetadataResult<VideoMetadata> {
    let video_id = item["id"].as_str().unwrap_or_default().to_string();
    let snippet = &item["snippet"];
    let title = snippet["title"].as_str().unwrap_or_default().to_string();
    let description = snippet["description"].as_str().map(|s| s.to_string());
    let channel_id = snippet["channelId"].as_str().unwrap_or_default().to_string();
    let channel_title = snippet["channelTitle"].as_str().unwrap_or_default().to_string();
    let published_at = snippet["publishedAt"]
        .as_str()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now);

    let duration_str = item["contentDetails"]["duration"].as_str().unwrap_or("PT0S");
    let duration_seconds = parse_iso8601_duration(duration_str).unwrap_or(0);

    let view_count = item["statistics"]["viewCount"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok());

    let is_available = title != "Private video";

    Ok(VideoMetadata {
        video_id,
        title,
        description,
        channel_id,
        channel_title,
        published_at,
        duration_seconds,
        view_count,
        is_available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_video_item_with_full_duration() {
        let item = serde_json::json!({
            "id": "abc123",
            "snippet": {
                "title": "Title",
                "description": "Desc",
                "channelId": "chan1",
                "channelTitle": "Chan",
                "publishedAt": "2024-01-01T00:00:00Z",
            },
            "contentDetails": { "duration": "PT1H2M3S" },
            "statistics": { "viewCount": "42" },
        });
        let parsed = parse_video_item(&item).unwrap();
        assert_eq!(parsed.video_id, "abc123");
        assert_eq!(parsed.duration_seconds, 3723);
        assert_eq!(parsed.view_count, Some(42));
        assert!(parsed.is_available);
    }

    #[test]
    fn missing_statistics_leaves_view_count_none() {
        let item = serde_json::json!({
            "id": "abc123",
            "snippet": {
                "title": "Title",
                "channelId": "chan1",
                "channelTitle": "Chan",
                "publishedAt": "2024-01-01T00:00:00Z",
            },
            "contentDetails": { "duration": "PT45S" },
        });
        let parsed = parse_video_item(&item).unwrap();
        assert_eq!(parsed.view_count, None);
        assert_eq!(parsed.duration_seconds, 45);
    }
}
