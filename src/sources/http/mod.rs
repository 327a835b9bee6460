use async_trait::async_trait;
use regex::Regex;
use reqwest::{
    StatusCode,
    header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap},
};
use std::sync::LazyLock;
use tracing::debug;

use crate::{
    common::errors::ResolutionError,
    protocol::tracks::TrackRef,
    sources::plugin::SourcePlugin,
};

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)https?://[^\s/$.?#].[^\s]*$").expect("static regex"));

static FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("static regex")
});

/// Direct stream addresses. The address is probed once so that dead links
/// and HTML pages are refused before they reach the queue.
pub struct HttpSource {
    http: reqwest::Client,
}

impl HttpSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn is_playable_content_type(content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        mime.starts_with("audio/")
            || mime.starts_with("video/")
            || matches!(
                mime.as_str(),
                "application/ogg"
                    | "application/octet-stream"
                    | "application/vnd.apple.mpegurl"
                    | "application/x-mpegurl"
            )
    }

    /// Prefers an attachment filename, then a radio station name, then the
    /// last path segment.
    pub fn title_from_headers(headers: &HeaderMap, url: &str) -> String {
        let from_disposition = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| FILENAME_REGEX.captures(v))
            .and_then(|c| c.get(1))
            .map(|m| TrackRef::title_from_uri(m.as_str()));
        if let Some(title) = from_disposition {
            return title;
        }

        let from_icy = headers
            .get("icy-name")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(title) = from_icy {
            return title;
        }

        TrackRef::title_from_uri(url)
    }

    async fn probe(&self, url: &str) -> Result<HeaderMap, ResolutionError> {
        let lookup = |e: reqwest::Error| ResolutionError::Lookup(e.to_string());

        let mut response = self.http.head(url).send().await.map_err(lookup)?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!("HEAD refused by {}, retrying with GET", url);
            response = self.http.get(url).send().await.map_err(lookup)?;
        }

        match response.status() {
            s if s.is_success() => Ok(response.headers().clone()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(ResolutionError::NotFound(url.to_string()))
            }
            s => Err(ResolutionError::Lookup(format!("{} answered {}", url, s))),
        }
    }
}

#[async_trait]
impl SourcePlugin for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn can_handle(&self, identifier: &str) -> bool {
        URL_REGEX.is_match(identifier)
    }

    async fn resolve(&self, identifier: &str) -> Result<TrackRef, ResolutionError> {
        let headers = self.probe(identifier).await?;

        if let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !Self::is_playable_content_type(content_type) {
                return Err(ResolutionError::Lookup(format!(
                    "{} is not an audio stream ({})",
                    identifier, content_type
                )));
            }
        }

        Ok(TrackRef::new(
            identifier,
            Self::title_from_headers(&headers, identifier),
        ))
    }
}
