use serde::{Deserialize, Serialize};

/// A resolved, playable audio reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    /// Address the voice session pulls audio from.
    pub source_uri: String,
    pub title: String,
}

impl TrackRef {
    pub fn new(source_uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            title: title.into(),
        }
    }

    /// Title derived from the last path segment of a URI, percent-decoded.
    pub fn title_from_uri(uri: &str) -> String {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let segment = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(uri);
        let decoded = urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string());
        let stem = match decoded.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 => stem.to_string(),
            _ => decoded,
        };
        if stem.trim().is_empty() {
            "Unknown Title".to_string()
        } else {
            stem
        }
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}
