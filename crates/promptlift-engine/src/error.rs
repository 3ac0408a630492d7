//! Engine errors.

use std::time::Duration;

use promptlift_bridge::BridgeError;
use thiserror::Error;

use crate::page::PageError;

/// Errors that can occur while resolving, enhancing or injecting.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No candidate input target on the current page.
    #[error("No input target found: {0}")]
    ResolutionFailure(String),

    /// Every commit strategy failed verification.
    #[error("Injection failed after {attempts} strategies: {message}")]
    InjectionFailure { attempts: usize, message: String },

    #[error("Remote rewrite timed out after {0:?}")]
    RemoteTimeout(Duration),

    #[error("Remote rewrite failed: {0}")]
    RemoteError(String),

    /// A pending insertion outlived its TTL.
    #[error("Pending insertion for {platform_id} expired {age_seconds}s after creation")]
    StaleInsertion { platform_id: String, age_seconds: i64 },

    #[error("Nothing to enhance")]
    EmptyDraft,

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid platform profile {id}: {message}")]
    InvalidProfile { id: String, message: String },

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl EngineError {
    /// Whether the error is surfaced to the user as a notice.
    ///
    /// Resolution failures stay silent; the engine keeps retrying.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            EngineError::ResolutionFailure(_) | EngineError::StaleInsertion { .. }
        )
    }
}
