use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Browser unavailable")]
    BrowserUnavailable,

    #[error("No element matched: {0}")]
    ElementNotFound(String),

    #[error("Navigation did not settle within {0:?}")]
    LoadTimeout(Duration),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("Remote fallback failed: {0}")]
    RemoteFallbackFailed(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Browser command failed: {0}")]
    PageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RenderError {
    /// Whether a local failure with this error should be re-issued against
    /// the remote rendering peer. Caller errors are surfaced immediately and
    /// a remote failure is terminal, so neither re-enters the state machine.
    pub fn triggers_fallback(&self) -> bool {
        !matches!(
            self,
            RenderError::MissingParameter(_)
                | RenderError::InvalidRequest(_)
                | RenderError::RemoteFallbackFailed(_)
                | RenderError::BrowserUnavailable
        )
    }

    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RenderError::MissingParameter(_) | RenderError::InvalidRequest(_)
        )
    }

    /// Helper for the pervasive `map_err` on CDP calls.
    pub fn page<E: std::fmt::Display>(err: E) -> Self {
        RenderError::PageError(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::SerializationError(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for RenderError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        RenderError::PageError(err.to_string())
    }
}
