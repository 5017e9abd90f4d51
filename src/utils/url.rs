//! URL utilities for consistent URL handling

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static SENSITIVE_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:key|api_key|access_token|token)=)[^&]*")
        .expect("sensitive parameter pattern must compile")
});

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Build the media URL served for a video by the media component
    ///
    /// ```rust
    /// use channelcast::utils::url::UrlUtils;
    ///
    /// assert_eq!(
    ///     UrlUtils::media_url("http://localhost:8080/", "abc123"),
    ///     "http://localhost:8080/video/abc123/track.mp3"
    /// );
    /// ```
    pub fn media_url(base_url: &str, video_id: &str) -> String {
        format!(
            "{}/video/{}/track.mp3",
            base_url.trim_end_matches('/'),
            urlencoding::encode(video_id)
        )
    }

    /// Join an API base URL with an endpoint path
    pub fn join(base: &str, path: &str) -> Result<Url, url::ParseError> {
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        base_url.join(path)
    }

    /// Replace API keys and tokens in a URL (or any text containing one) with
    /// asterisks so it can be logged
    pub fn obfuscate_credentials(url: &str) -> String {
        SENSITIVE_PARAM_RE.replace_all(url, "${1}****").to_string()
    }
}
