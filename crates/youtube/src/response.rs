//! Typed subset of the `videos.list` response.

use serde::Deserialize;
use watchlog_core::metadata::{parse_iso8601_duration, MediaMetadata, ProviderError};

/// Body of `GET /videos?part=snippet,contentDetails`.
#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub snippet: Snippet,
    pub content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
pub struct Snippet {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentDetails {
    /// ISO 8601 duration, e.g. `PT4M13S`.
    pub duration: String,
}

impl VideoListResponse {
    /// Reduce the response to exactly one video's metadata.
    ///
    /// Zero items is [`ProviderError::NotFound`]; more than one is
    /// [`ProviderError::Ambiguous`].
    pub fn into_metadata(self) -> Result<MediaMetadata, ProviderError> {
        let mut items = self.items;
        match items.len() {
            0 => Err(ProviderError::NotFound),
            1 => {
                let item = items.remove(0);
                Ok(MediaMetadata {
                    title: item.snippet.title,
                    duration_secs: parse_iso8601_duration(&item.content_details.duration)?,
                })
            }
            count => Err(ProviderError::Ambiguous { count }),
        }
    }
}

/// Decode a raw response body.
pub fn parse_video_list(body: &str) -> Result<MediaMetadata, ProviderError> {
    let response: VideoListResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    response.into_metadata()
}
