//! Media URL helpers: validation, YouTube recognition, thumbnails and
//! resume links.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum accepted length of a media URL.
pub const MAX_MEDIA_URL_LEN: usize = 2048;

/// `https://www.youtube.com/watch?v=ID` (the `v` parameter may appear anywhere
/// in the query).
static YOUTUBE_WATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?youtube\.com/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]+)")
        .expect("valid regex")
});

/// `https://youtu.be/ID`
static YOUTUBE_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://youtu\.be/([A-Za-z0-9_-]+)").expect("valid regex"));

/// Trim a submitted URL; blank input means "no URL".
pub fn normalize_media_url(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Validate that a media URL is an absolute http(s) URL of sane length.
pub fn validate_media_url(url: &str) -> Result<(), CoreError> {
    if url.len() > MAX_MEDIA_URL_LEN {
        return Err(CoreError::Validation(format!(
            "Media URL exceeds {MAX_MEDIA_URL_LEN} characters"
        )));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CoreError::Validation(format!(
            "Media URL must start with http:// or https://, got '{url}'"
        )));
    }
    Ok(())
}

/// Extract the YouTube video ID, if `url` is a YouTube video link.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    YOUTUBE_WATCH_RE
        .captures(url)
        .or_else(|| YOUTUBE_SHORT_RE.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_youtube_url(url: &str) -> bool {
    youtube_video_id(url).is_some()
}

/// Medium-quality thumbnail for a YouTube video.
pub fn thumbnail_url(url: &str) -> Option<String> {
    youtube_video_id(url).map(|id| format!("https://img.youtube.com/vi/{id}/mqdefault.jpg"))
}

/// Link that resumes playback at `position_sec`. Only YouTube links support it.
pub fn resume_url(url: &str, position_sec: i64) -> Option<String> {
    if !is_youtube_url(url) {
        return None;
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    Some(format!("{url}{separator}t={position_sec}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- normalize / validate ------------------------------------------------

    #[test]
    fn blank_url_normalizes_to_none() {
        assert_eq!(normalize_media_url(None), None);
        assert_eq!(normalize_media_url(Some("   ")), None);
        assert_eq!(
            normalize_media_url(Some(" https://example.com/v ")),
            Some("https://example.com/v".to_string())
        );
    }

    #[test]
    fn validate_accepts_http_urls() {
        assert!(validate_media_url("https://www.example.com/watch?v=123456").is_ok());
        assert!(validate_media_url("http://media.example.com").is_ok());
    }

    #[test]
    fn validate_rejects_other_schemes_and_long_urls() {
        assert!(validate_media_url("ftp://example.com/a.mp4").is_err());
        assert!(validate_media_url("example.com").is_err());
        let long = format!("https://example.com/{}", "a".repeat(MAX_MEDIA_URL_LEN));
        assert!(validate_media_url(&long).is_err());
    }

    // -- youtube recognition -------------------------------------------------

    #[test]
    fn recognizes_watch_urls() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=abcdefg12345"),
            Some("abcdefg12345")
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/watch?list=PL1&v=abc-_9"),
            Some("abc-_9")
        );
    }

    #[test]
    fn recognizes_short_urls() {
        assert_eq!(youtube_video_id("https://youtu.be/abcdefg12345"), Some("abcdefg12345"));
    }

    #[test]
    fn other_sites_are_not_youtube() {
        assert!(!is_youtube_url("https://www.test.com/foo/bar"));
        assert!(!is_youtube_url("https://www.example.com/watch?v=123456"));
        assert!(!is_youtube_url(""));
    }

    // -- thumbnail_url -------------------------------------------------------

    #[test]
    fn thumbnail_for_youtube_urls() {
        let expected = Some("https://img.youtube.com/vi/abcdefg12345/mqdefault.jpg".to_string());
        assert_eq!(thumbnail_url("https://www.youtube.com/watch?v=abcdefg12345"), expected);
        assert_eq!(thumbnail_url("https://youtu.be/abcdefg12345"), expected);
    }

    #[test]
    fn no_thumbnail_for_other_sites() {
        assert_eq!(thumbnail_url("https://www.test.com/foo/bar"), None);
    }

    // -- resume_url ----------------------------------------------------------

    #[test]
    fn resume_appends_to_existing_query() {
        assert_eq!(
            resume_url("https://www.youtube.com/watch?v=123456", 3600).as_deref(),
            Some("https://www.youtube.com/watch?v=123456&t=3600")
        );
    }

    #[test]
    fn resume_starts_query_for_short_urls() {
        assert_eq!(
            resume_url("https://youtu.be/123456", 62).as_deref(),
            Some("https://youtu.be/123456?t=62")
        );
    }

    #[test]
    fn no_resume_link_for_other_sites() {
        assert_eq!(resume_url("https://www.example.com/watch?v=123456", 10), None);
    }
}
