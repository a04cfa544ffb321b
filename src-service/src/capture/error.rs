//! Error types for capture operations.

use std::fmt;

/// Error type for capture operations.
#[derive(Debug)]
pub enum CaptureError {
    /// Camera access denied, or no device matches the requested facing mode.
    /// Terminal for the session; never retried automatically.
    PermissionDenied(String),
    /// The video surface or overlay has not been laid out yet (zero-sized
    /// measurement). Transient; callers retry on the next frame.
    LayoutNotReady,
    /// Still-image encoding failed
    EncodingFailed(String),
    /// Operation not valid in the session's current phase
    InvalidState(String),
    /// A capture attempt is already in flight
    CaptureInProgress,
    /// Capture not permitted yet (document not framed)
    NotReady(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "Camera access denied: {}", msg),
            CaptureError::LayoutNotReady => write!(f, "Layout not ready"),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            CaptureError::CaptureInProgress => write!(f, "Capture already in progress"),
            CaptureError::NotReady(msg) => write!(f, "Not ready: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<CaptureError> for String {
    fn from(err: CaptureError) -> Self {
        err.to_string()
    }
}
