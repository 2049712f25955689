//! REST client for the YouTube Data API `videos` endpoint.

use watchlog_core::media_url::youtube_video_id;
use watchlog_core::metadata::{MediaMetadata, MetadataProvider, ProviderError};

use crate::response::parse_video_list;

/// Default base URL of the YouTube Data API v3.
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// HTTP client for the YouTube Data API.
pub struct YouTubeApi {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl YouTubeApi {
    /// Create a client.
    ///
    /// * `api_key` - Data API key sent as the `key` query parameter.
    /// * `api_url` - Base URL, e.g. [`DEFAULT_API_URL`].
    pub fn new(api_key: String, api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, api_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_key: String, api_url: String) -> Self {
        Self {
            client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up title and duration of one video by its ID.
    ///
    /// Sends `GET /videos?part=snippet,contentDetails&id={video_id}`.
    pub async fn video_metadata(&self, video_id: &str) -> Result<MediaMetadata, ProviderError> {
        let response = self
            .client
            .get(format!("{}/videos", self.api_url))
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let response = Self::ensure_success(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        parse_video_list(&body)
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into [`ProviderError::Api`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl MetadataProvider for YouTubeApi {
    async fn fetch(&self, media_url: &str) -> Result<MediaMetadata, ProviderError> {
        let video_id = youtube_video_id(media_url)
            .ok_or_else(|| ProviderError::UnsupportedUrl(media_url.to_string()))?;

        tracing::debug!(video_id, "Fetching YouTube video metadata");
        let metadata = self.video_metadata(video_id).await?;
        tracing::debug!(
            video_id,
            duration_secs = metadata.duration_secs,
            "Fetched YouTube video metadata"
        );
        Ok(metadata)
    }
}
