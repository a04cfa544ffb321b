//! Runtime types for capture operations (service-internal).
//!
//! These types carry live pixel data and stream ownership; they never cross
//! the IPC boundary. For IPC-compatible types, see vericap-common.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use vericap_common::{CaptureMode, FacingMode};

/// A captured frame with its dimensions and pixel data.
#[derive(Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,
}

/// Handle to stop an ongoing stream.
pub type StopHandle = Arc<AtomicBool>;

/// Receiver for live frames.
pub type FrameReceiver = mpsc::Receiver<CapturedFrame>;

/// Parameters for a camera stream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: FacingMode,
    /// Ideal resolution hint; the backend may deliver something else
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl StreamRequest {
    /// The constraints a capture mode asks of the camera.
    pub fn for_mode(mode: CaptureMode) -> Self {
        let (ideal_width, ideal_height) = mode.ideal_resolution();
        Self {
            facing: mode.facing(),
            ideal_width,
            ideal_height,
        }
    }
}

/// Exclusive ownership of an active camera stream.
///
/// Exactly one handle exists per acquisition; releasing it stops every
/// track. Dropping the handle releases unconditionally, so a stream can
/// never outlive the session that acquired it.
pub struct MediaStreamHandle {
    stop: StopHandle,
}

impl MediaStreamHandle {
    pub fn new(stop: StopHandle) -> Self {
        Self { stop }
    }

    /// Stop all tracks. Idempotent.
    pub fn release(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for MediaStreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_request_follows_mode() {
        let doc = StreamRequest::for_mode(CaptureMode::DocumentSide);
        assert_eq!(doc.facing, FacingMode::Environment);
        assert_eq!((doc.ideal_width, doc.ideal_height), (1920, 1080));

        let selfie = StreamRequest::for_mode(CaptureMode::Selfie);
        assert_eq!(selfie.facing, FacingMode::User);
        assert_eq!((selfie.ideal_width, selfie.ideal_height), (1280, 720));
    }

    #[test]
    fn dropping_handle_stops_tracks() {
        let stop: StopHandle = Arc::new(AtomicBool::new(false));
        {
            let handle = MediaStreamHandle::new(stop.clone());
            assert!(!stop.load(Ordering::Relaxed));
            drop(handle);
        }
        assert!(stop.load(Ordering::Relaxed));
    }
}
