//! Exit codes for the CLI.
//!
//! These codes enable scripting integration by providing structured
//! feedback about operation results.

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)] // clap produces InvalidArguments itself
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command-line arguments
    InvalidArguments = 2,
    /// Failed to connect to the service
    ServiceConnectionFailed = 3,
    /// Camera access was denied
    PermissionDenied = 4,
    /// Capture failed or timed out
    CaptureFailed = 5,
    /// Verification submission failed
    SubmissionFailed = 6,
    /// Verification completed but the document was rejected
    DocumentRejected = 7,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::ServiceConnectionFailed => write!(f, "service connection failed"),
            ExitCode::PermissionDenied => write!(f, "camera permission denied"),
            ExitCode::CaptureFailed => write!(f, "capture failed"),
            ExitCode::SubmissionFailed => write!(f, "submission failed"),
            ExitCode::DocumentRejected => write!(f, "document rejected"),
        }
    }
}
