//! Camera capture core: geometry engine, still extraction, and the
//! capture session state machine.
//!
//! Device access sits behind the [`CameraBackend`] trait so the session is
//! independent of where frames come from; the shipped backend is the
//! synthetic camera in [`sim`].

pub mod detector;
pub mod error;
pub mod geometry;
pub mod session;
pub mod sim;
pub mod still;
pub mod types;

pub use detector::{ContrastDetector, DetectorPort};
pub use error::CaptureError;
pub use session::{CaptureSession, SessionEvent};
pub use sim::SimCamera;
pub use still::CapturedStill;
pub use types::{CapturedFrame, FrameReceiver, MediaStreamHandle, StopHandle, StreamRequest};

/// Camera acquisition collaborator.
///
/// Implementations hand back a live frame receiver plus a stop handle;
/// setting the stop handle releases every track belonging to the stream.
pub trait CameraBackend: Send + Sync {
    /// Request a stream matching the given constraints.
    ///
    /// Fails with [`CaptureError::PermissionDenied`] when access is
    /// rejected or no device matches the requested facing mode.
    fn start_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError>;
}
