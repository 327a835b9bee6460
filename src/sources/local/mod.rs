use std::path::Path;

use async_trait::async_trait;

use crate::{
    common::errors::ResolutionError,
    protocol::tracks::TrackRef,
    sources::plugin::SourcePlugin,
};

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "opus", "wav", "m4a", "aac", "webm", "mka",
];

/// Audio files on the local filesystem, given as an absolute path or a
/// `file://` URI.
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }

    fn path_of(identifier: &str) -> &str {
        identifier.strip_prefix("file://").unwrap_or(identifier)
    }

    fn has_audio_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourcePlugin for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    fn can_handle(&self, identifier: &str) -> bool {
        identifier.starts_with("file://") || identifier.starts_with('/')
    }

    async fn resolve(&self, identifier: &str) -> Result<TrackRef, ResolutionError> {
        let path = Path::new(Self::path_of(identifier));

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| ResolutionError::NotFound(identifier.to_string()))?;
        if !metadata.is_file() {
            return Err(ResolutionError::Lookup(format!("{} is not a file", path.display())));
        }
        if !Self::has_audio_extension(path) {
            return Err(ResolutionError::Unsupported(identifier.to_string()));
        }

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| TrackRef::title_from_uri(identifier));

        Ok(TrackRef::new(path.to_string_lossy(), title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("staytune-local-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(name);
        std::fs::write(&path, b"ID3").expect("temp file");
        path
    }

    #[tokio::test]
    async fn test_resolves_existing_audio_file() {
        let path = temp_file("Blue Monday.mp3");
        let uri = format!("file://{}", path.display());

        let track = LocalSource::new().resolve(&uri).await.expect("resolved");
        assert_eq!(track.title, "Blue Monday");
        assert_eq!(track.source_uri, path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_missing_and_non_audio_files() {
        let source = LocalSource::new();
        assert!(matches!(
            source.resolve("/definitely/not/here.mp3").await,
            Err(ResolutionError::NotFound(_))
        ));

        let path = temp_file("notes.txt");
        assert!(matches!(
            source.resolve(&path.to_string_lossy()).await,
            Err(ResolutionError::Unsupported(_))
        ));
    }
}
