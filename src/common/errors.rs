use std::time::Duration;

use serde::Serialize;

use crate::common::types::DestinationId;

/// Failures talking to the voice transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("timed out after {timeout:?} connecting to {destination}")]
    Timeout {
        destination: DestinationId,
        timeout: Duration,
    },
    #[error("destination {0} does not exist or cannot be joined")]
    InvalidDestination(DestinationId),
    #[error("voice session rejected the request: {0}")]
    Rejected(String),
    #[error("voice session is not connected")]
    Disconnected,
}

impl TransportError {
    /// Permanent failures stop a stay session from retrying.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidDestination(_))
    }
}

/// Failures turning a query into a playable track.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no source can handle `{0}`")]
    Unsupported(String),
    #[error("nothing found for `{0}`")]
    NotFound(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// JSON error body returned by the REST surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(400, "Bad Request", message, path)
    }

    pub fn not_found(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(404, "Not Found", message, path)
    }

    fn new(
        status: u16,
        error: &str,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: crate::common::types::now_ms(),
            status,
            error: error.into(),
            message: message.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_destination_is_permanent() {
        assert!(TransportError::InvalidDestination("gone".into()).is_permanent());
        assert!(
            !TransportError::Timeout {
                destination: "lobby".into(),
                timeout: Duration::from_secs(10),
            }
            .is_permanent()
        );
        assert!(!TransportError::Disconnected.is_permanent());
        assert!(!TransportError::Rejected("busy".into()).is_permanent());
    }

    #[test]
    fn test_error_messages_name_the_destination() {
        let err = TransportError::Timeout {
            destination: "lobby".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "timed out after 10s connecting to lobby");
    }
}
