//! Document-readiness detection.
//!
//! A stand-in for real document detection: the session only needs a boolean
//! "is a document plausibly framed" signal to gate the manual capture
//! button, polled while the stream is live. The port keeps the state
//! machine independent of whatever produces the signal, so a real
//! computer-vision implementation can be swapped in without touching it.

use super::geometry::{OverlayRegion, VideoGeometry};
use super::types::CapturedFrame;

/// Minimum luma variance inside the guide window for a frame to count as
/// "document framed". Uniform scenes (wall, ceiling, lens cap) sit far
/// below this; a card held up to the camera sits far above.
const LUMA_VARIANCE_THRESHOLD: f64 = 200.0;

/// Sampling stride in pixels; every Nth pixel on every Nth row.
const SAMPLE_STRIDE: u32 = 8;

/// Boolean readiness input gating document capture.
pub trait DetectorPort: Send + Sync {
    /// Assess whether a document is plausibly framed inside the overlay.
    fn assess(&self, frame: &CapturedFrame, geometry: &VideoGeometry, overlay: &OverlayRegion)
        -> bool;
}

/// Luma-variance heuristic detector.
///
/// Maps the overlay into frame coordinates via the geometry engine, samples
/// luma on a stride grid inside that window, and thresholds the variance.
/// Crude, but deterministic, and honest about being a placeholder.
pub struct ContrastDetector {
    threshold: f64,
}

impl ContrastDetector {
    pub fn new() -> Self {
        Self {
            threshold: LUMA_VARIANCE_THRESHOLD,
        }
    }

    #[cfg(test)]
    fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ContrastDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorPort for ContrastDetector {
    fn assess(
        &self,
        frame: &CapturedFrame,
        geometry: &VideoGeometry,
        overlay: &OverlayRegion,
    ) -> bool {
        let rect = match super::geometry::compute_source_crop(geometry, overlay) {
            Ok(rect) => rect,
            // Layout race; not ready by definition
            Err(_) => return false,
        };

        let mut count = 0u64;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;

        let mut y = rect.y;
        while y < rect.y + rect.height {
            let mut x = rect.x;
            while x < rect.x + rect.width {
                let i = ((y * frame.width + x) as usize) * 4;
                if i + 2 < frame.data.len() {
                    let luma = 0.299 * frame.data[i] as f64
                        + 0.587 * frame.data[i + 1] as f64
                        + 0.114 * frame.data[i + 2] as f64;
                    sum += luma;
                    sum_sq += luma * luma;
                    count += 1;
                }
                x += SAMPLE_STRIDE;
            }
            y += SAMPLE_STRIDE;
        }

        if count < 4 {
            return false;
        }

        let mean = sum / count as f64;
        let variance = sum_sq / count as f64 - mean * mean;
        variance > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vericap_common::{CaptureMode, FitMode, ViewportLayout};

    use crate::capture::geometry::OverlaySpec;

    fn geometry(frame: &CapturedFrame) -> (VideoGeometry, OverlayRegion) {
        let viewport = ViewportLayout {
            width: 320.0,
            height: 180.0,
            fit: FitMode::Cover,
        };
        let geometry = VideoGeometry::new(frame.width, frame.height, viewport);
        let overlay = OverlaySpec::for_mode(CaptureMode::DocumentSide).layout(&viewport);
        (geometry, overlay)
    }

    fn uniform_frame(width: u32, height: u32, value: u8) -> CapturedFrame {
        CapturedFrame {
            width,
            height,
            data: vec![value; (width * height * 4) as usize],
        }
    }

    /// Frame with a bright rectangle over a dark background, loosely shaped
    /// like a card held inside the guide.
    fn card_frame(width: u32, height: u32) -> CapturedFrame {
        let mut data = vec![20u8; (width * height * 4) as usize];
        let (x0, x1) = (width / 4, width * 3 / 4);
        let (y0, y1) = (height / 4, height * 3 / 4);
        for y in y0..y1 {
            for x in x0..x1 {
                let i = ((y * width + x) as usize) * 4;
                data[i..i + 4].copy_from_slice(&[230, 230, 230, 255]);
            }
        }
        CapturedFrame {
            width,
            height,
            data,
        }
    }

    #[test]
    fn uniform_scene_is_not_ready() {
        let frame = uniform_frame(640, 360, 128);
        let (geometry, overlay) = geometry(&frame);
        let detector = ContrastDetector::new();
        assert!(!detector.assess(&frame, &geometry, &overlay));
    }

    #[test]
    fn high_contrast_card_is_ready() {
        let frame = card_frame(640, 360);
        let (geometry, overlay) = geometry(&frame);
        let detector = ContrastDetector::new();
        assert!(detector.assess(&frame, &geometry, &overlay));
    }

    #[test]
    fn unmeasured_layout_is_never_ready() {
        let frame = card_frame(640, 360);
        let geometry = VideoGeometry::new(
            frame.width,
            frame.height,
            ViewportLayout {
                width: 0.0,
                height: 0.0,
                fit: FitMode::Cover,
            },
        );
        let overlay = OverlayRegion {
            shape: vericap_common::StillShape::Rectangular,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        };
        let detector = ContrastDetector::with_threshold(0.0);
        assert!(!detector.assess(&frame, &geometry, &overlay));
    }
}
