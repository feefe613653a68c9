//! YouTube Data API metadata lookup.

use crate::error::{Result, SievetubeError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument};

const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("Invalid regex")
});

/// Metadata shown next to the chat and passed into the chat prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoInfo {
    pub title: String,
    pub channel_title: String,
    /// Duration in seconds.
    pub duration: u64,
    pub description: String,
    pub published_at: String,
    pub view_count: String,
    pub like_count: String,
    pub thumbnail_url: String,
}

/// Client for the `videos` endpoint of the YouTube Data API v3.
pub struct VideoInfoClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VideoInfoClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: YOUTUBE_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (for proxies or tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch title, channel, duration and statistics for a video.
    #[instrument(skip(self))]
    pub async fn fetch(&self, video_id: &str) -> Result<VideoInfo> {
        let url = url::Url::parse_with_params(
            &self.base_url,
            &[
                ("part", "snippet,contentDetails,statistics"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| SievetubeError::Config(format!("Invalid YouTube API URL: {}", e)))?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SievetubeError::VideoInfo(format!(
                "Failed to fetch video info from YouTube: {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;
        debug!("Received video info response");
        parse_video_info(&json)
    }
}

/// Extract [`VideoInfo`] from a `videos.list` response body.
pub(crate) fn parse_video_info(json: &serde_json::Value) -> Result<VideoInfo> {
    let video = json["items"]
        .get(0)
        .ok_or_else(|| SievetubeError::VideoInfo("Video not found".to_string()))?;

    let snippet = &video["snippet"];
    let statistics = &video["statistics"];
    let text = |v: &serde_json::Value| v.as_str().unwrap_or_default().to_string();

    let thumbnail_url = snippet["thumbnails"]["maxres"]["url"]
        .as_str()
        .or_else(|| snippet["thumbnails"]["high"]["url"].as_str())
        .or_else(|| snippet["thumbnails"]["default"]["url"].as_str())
        .unwrap_or_default()
        .to_string();

    Ok(VideoInfo {
        title: text(&snippet["title"]),
        channel_title: text(&snippet["channelTitle"]),
        duration: video["contentDetails"]["duration"]
            .as_str()
            .and_then(parse_iso8601_duration)
            .unwrap_or(0),
        description: text(&snippet["description"]),
        published_at: text(&snippet["publishedAt"]),
        view_count: text(&statistics["viewCount"]),
        like_count: text(&statistics["likeCount"]),
        thumbnail_url,
    })
}

/// Parse an ISO-8601 duration such as `PT1H2M3S` into seconds.
pub fn parse_iso8601_duration(input: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(input.trim())?;
    let field = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    Some(field(1) * 86_400 + field(2) * 3600 + field(3) * 60 + field(4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("1:00"), None);
    }

    #[test]
    fn test_parse_video_info() {
        let body = json!({
            "items": [{
                "snippet": {
                    "title": "Never Gonna Give You Up",
                    "channelTitle": "Rick Astley",
                    "description": "Official video",
                    "publishedAt": "2009-10-25T06:57:33Z",
                    "thumbnails": { "high": { "url": "https://i.ytimg.com/hq.jpg" } }
                },
                "contentDetails": { "duration": "PT3M33S" },
                "statistics": { "viewCount": "100", "likeCount": "10" }
            }]
        });

        let info = parse_video_info(&body).unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.duration, 213);
        assert_eq!(info.thumbnail_url, "https://i.ytimg.com/hq.jpg");
        assert_eq!(info.view_count, "100");
    }

    #[test]
    fn test_parse_video_info_not_found() {
        let err = parse_video_info(&json!({ "items": [] })).unwrap_err();
        assert!(matches!(err, SievetubeError::VideoInfo(_)));
    }
}
