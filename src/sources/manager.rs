use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    http::HttpSource,
    local::LocalSource,
    plugin::{BoxedSource, TrackResolver},
};
use crate::{common::errors::ResolutionError, configs::SourcesConfig, protocol::tracks::TrackRef};

/// Routes a query to the first registered source that claims it.
pub struct SourceManager {
    pub sources: Vec<BoxedSource>,
}

impl SourceManager {
    pub fn new(config: &SourcesConfig, http: reqwest::Client) -> Self {
        let mut sources: Vec<BoxedSource> = Vec::new();

        macro_rules! register_source {
            ($enabled:expr, $name:literal, $ctor:expr) => {
                if $enabled {
                    info!("Loaded source: {}", $name);
                    sources.push(Box::new($ctor));
                }
            };
        }

        register_source!(config.local, "local", LocalSource::new());
        register_source!(config.http, "http", HttpSource::new(http));

        Self { sources }
    }

    pub fn with_sources(sources: Vec<BoxedSource>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}

#[async_trait]
impl TrackResolver for SourceManager {
    async fn resolve(&self, query: &str) -> Result<TrackRef, ResolutionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolutionError::Unsupported(String::new()));
        }

        let source = self
            .sources
            .iter()
            .find(|s| s.can_handle(query))
            .ok_or_else(|| ResolutionError::Unsupported(query.to_string()))?;

        debug!("Resolving '{}' via {}", query, source.name());
        source.resolve(query).await
    }
}
