use async_trait::async_trait;

use crate::{common::errors::ResolutionError, protocol::tracks::TrackRef};

/// Turns free text or a direct reference into a playable track.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<TrackRef, ResolutionError>;
}

/// Trait that all source plugins must implement.
///
/// Each source checks whether it understands an identifier and, if so,
/// resolves it into a [`TrackRef`].
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Unique identifier for this source (e.g. "http", "local").
    fn name(&self) -> &str;

    fn can_handle(&self, identifier: &str) -> bool;

    async fn resolve(&self, identifier: &str) -> Result<TrackRef, ResolutionError>;
}

pub type BoxedSource = Box<dyn SourcePlugin>;
