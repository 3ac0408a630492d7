//! Bridge error types.

use thiserror::Error;

/// Errors raised on either side of the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Network failure talking to a remote endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service answered with an explicit failure.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The background side reported a failure for a request.
    #[error("Bridge request failed: {0}")]
    Failed(String),

    /// Request timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Durable storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Action not handled by this bridge.
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Opening a page failed.
    #[error("Failed to open page: {0}")]
    TabOpen(String),
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BridgeError::Timeout(e.to_string())
        } else {
            BridgeError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = BridgeError::Remote("quota exceeded".to_string());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_serialization_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = BridgeError::from(json_err);
        assert!(matches!(err, BridgeError::Serialization(_)));
    }
}
