//! Synthetic camera backend.
//!
//! Produces a deterministic test pattern over the same channel discipline a
//! real device backend would use: frames pushed into a bounded mpsc channel,
//! dropped when the consumer lags, stopped via the shared stop flag. Used
//! for headless operation and for exercising the session state machine in
//! tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::error::CaptureError;
use super::types::{CapturedFrame, FrameReceiver, StopHandle, StreamRequest};
use super::CameraBackend;

/// Frame interval (~15 fps; plenty for a capture flow).
const FRAME_INTERVAL: Duration = Duration::from_millis(66);

/// Channel capacity before frames are dropped.
const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Synthetic camera delivering the requested resolution.
pub struct SimCamera {
    /// When set, stream requests fail as if the user denied access.
    deny_access: bool,
}

impl SimCamera {
    pub fn new() -> Self {
        Self { deny_access: false }
    }

    /// A backend that refuses every stream request.
    pub fn denied() -> Self {
        Self { deny_access: true }
    }
}

impl Default for SimCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SimCamera {
    fn start_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError> {
        if self.deny_access {
            return Err(CaptureError::PermissionDenied(
                "camera access rejected".to_string(),
            ));
        }

        let width = request.ideal_width;
        let height = request.ideal_height;
        let (frame_tx, frame_rx) = mpsc::channel::<CapturedFrame>(FRAME_CHANNEL_CAPACITY);
        let stop_flag: StopHandle = Arc::new(AtomicBool::new(false));
        let stop = stop_flag.clone();

        tokio::spawn(async move {
            let mut sequence = 0u64;
            loop {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let frame = test_pattern(width, height, sequence);
                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Consumer lagging; drop the frame
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
                sequence += 1;
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
            debug!("sim camera stream stopped after {} frames", sequence);
        });

        Ok((frame_rx, stop_flag))
    }
}

/// Gradient background with a bright card-shaped panel in the middle, so
/// the contrast detector has something to find.
fn test_pattern(width: u32, height: u32, sequence: u64) -> CapturedFrame {
    let mut data = vec![0u8; (width * height * 4) as usize];
    let (x0, x1) = (width / 4, width * 3 / 4);
    let (y0, y1) = (height / 3, height * 2 / 3);
    let wobble = (sequence % 32) as u8;

    for y in 0..height {
        for x in 0..width {
            let i = ((y * width + x) as usize) * 4;
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                data[i] = 235;
                data[i + 1] = 235;
                data[i + 2] = 220;
            } else {
                data[i] = (x * 64 / width.max(1)) as u8 + wobble;
                data[i + 1] = (y * 64 / height.max(1)) as u8;
                data[i + 2] = 40;
            }
            data[i + 3] = 255;
        }
    }

    CapturedFrame {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vericap_common::CaptureMode;

    #[tokio::test(start_paused = true)]
    async fn delivers_frames_at_requested_resolution() {
        let camera = SimCamera::new();
        let request = StreamRequest::for_mode(CaptureMode::Selfie);
        let (mut rx, stop) = camera.start_stream(&request).unwrap();

        let frame = rx.recv().await.expect("first frame");
        assert_eq!((frame.width, frame.height), (1280, 720));
        assert_eq!(frame.data.len(), (1280 * 720 * 4) as usize);

        stop.store(true, Ordering::Relaxed);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_flag_ends_the_stream() {
        let camera = SimCamera::new();
        let request = StreamRequest::for_mode(CaptureMode::DocumentSide);
        let (mut rx, stop) = camera.start_stream(&request).unwrap();

        let _ = rx.recv().await.expect("first frame");
        stop.store(true, Ordering::Relaxed);

        // Drain until the producer notices the flag and closes the channel.
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn denied_backend_reports_permission_error() {
        let camera = SimCamera::denied();
        let request = StreamRequest::for_mode(CaptureMode::Selfie);
        assert!(matches!(
            camera.start_stream(&request),
            Err(CaptureError::PermissionDenied(_))
        ));
    }
}
