//! Capture geometry engine.
//!
//! The guide overlay the user sees is laid out in display pixels, while the
//! only pixels available for cropping are the camera's native frame. The two
//! coordinate spaces are related by a single uniform scale plus a centering
//! offset whose sign depends on whether the video surface fills the display
//! box (cover, overflow clipped) or fits inside it (contain, letterboxed).
//! This module inverts that mapping: given the measured layout and the
//! overlay region, it computes the exact sub-rectangle of the native frame
//! that reproduces what the user saw inside the guide.

use vericap_common::{CaptureMode, FitMode, StillShape, ViewportLayout};

use super::error::CaptureError;

/// Document guide width as a fraction of the displayed video width.
const DOCUMENT_WIDTH_FRAC: f64 = 0.85;
/// Document guide aspect ratio (width / height), ID-1 card shaped.
const DOCUMENT_ASPECT: f64 = 1.6;
/// Document guide width ceiling in display pixels.
const DOCUMENT_MAX_WIDTH: f64 = 380.0;
/// Selfie guide diameter as a fraction of the smaller displayed dimension.
const SELFIE_DIAMETER_FRAC: f64 = 0.6;

/// Everything needed to relate display coordinates to native-frame pixels:
/// the camera's intrinsic resolution plus the measured on-screen layout.
///
/// Recomputed for every capture attempt; never cached across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoGeometry {
    /// Native pixel resolution delivered by the camera
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
    /// On-screen box occupied by the video surface, and the fit in effect
    pub viewport: ViewportLayout,
}

impl VideoGeometry {
    pub fn new(intrinsic_width: u32, intrinsic_height: u32, viewport: ViewportLayout) -> Self {
        Self {
            intrinsic_width,
            intrinsic_height,
            viewport,
        }
    }
}

/// Guide overlay shape for a capture mode, before layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlaySpec {
    /// Rectangular document frame: fraction-of-width sizing at a fixed
    /// aspect, with a pixel ceiling
    Rect {
        aspect: f64,
        width_frac: f64,
        max_width: f64,
    },
    /// Circular face frame: diameter as a fraction of the smaller
    /// displayed dimension
    Circle { diameter_frac: f64 },
}

impl OverlaySpec {
    /// The guide used for a capture mode.
    pub fn for_mode(mode: CaptureMode) -> Self {
        match mode {
            CaptureMode::DocumentSide => OverlaySpec::Rect {
                aspect: DOCUMENT_ASPECT,
                width_frac: DOCUMENT_WIDTH_FRAC,
                max_width: DOCUMENT_MAX_WIDTH,
            },
            CaptureMode::Selfie => OverlaySpec::Circle {
                diameter_frac: SELFIE_DIAMETER_FRAC,
            },
        }
    }

    /// Resolve the guide to an on-screen box centered in the displayed
    /// video area. Coordinates are relative to the video surface's own
    /// top-left, in display pixels.
    ///
    /// The resolved region is always fully contained within the displayed
    /// box: rectangles additionally cap their width so the derived height
    /// fits, circles never exceed the smaller dimension.
    pub fn layout(&self, viewport: &ViewportLayout) -> OverlayRegion {
        let dw = viewport.width;
        let dh = viewport.height;
        let (shape, width, height) = match *self {
            OverlaySpec::Rect {
                aspect,
                width_frac,
                max_width,
            } => {
                let width = (dw * width_frac).min(max_width).min(dh * aspect);
                (StillShape::Rectangular, width, width / aspect)
            }
            OverlaySpec::Circle { diameter_frac } => {
                let diameter = dw.min(dh) * diameter_frac;
                (StillShape::Circular, diameter, diameter)
            }
        };
        OverlayRegion {
            shape,
            left: (dw - width) / 2.0,
            top: (dh - height) / 2.0,
            width,
            height,
        }
    }
}

/// A resolved guide overlay: its on-screen bounding box (same coordinate
/// space as the displayed video box) and the mask shape it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRegion {
    pub shape: StillShape,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer crop rectangle in native-frame pixels, ready for direct buffer
/// extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map an on-screen overlay region into the exact sub-rectangle of the
/// camera's native frame that the user saw inside it.
///
/// Cover scales by `max(dw/iw, dh/ih)` and the display box clips half the
/// overflow from each side; contain scales by `min(...)` and centers the
/// frame inside letterbox padding. Both reduce to one signed offset
/// (`(display - rendered) / 2`, negative for cover overflow, positive for
/// contain padding) that is undone before dividing by the scale.
///
/// The result is clamped into `[0, intrinsic]` on both axes; degenerate
/// measurements (zero-sized viewport, overlay, or frame) are refused with
/// [`CaptureError::LayoutNotReady`] rather than producing a corrupt crop.
pub fn compute_source_crop(
    geometry: &VideoGeometry,
    overlay: &OverlayRegion,
) -> Result<SourceRect, CaptureError> {
    let iw = geometry.intrinsic_width as f64;
    let ih = geometry.intrinsic_height as f64;
    let dw = geometry.viewport.width;
    let dh = geometry.viewport.height;

    if iw <= 0.0 || ih <= 0.0 || dw <= 0.0 || dh <= 0.0 {
        return Err(CaptureError::LayoutNotReady);
    }
    if overlay.width <= 0.0 || overlay.height <= 0.0 {
        return Err(CaptureError::LayoutNotReady);
    }

    let scale = match geometry.viewport.fit {
        FitMode::Cover => (dw / iw).max(dh / ih),
        FitMode::Contain => (dw / iw).min(dh / ih),
    };

    // Where the rendered (pre-clip) frame's top-left sits relative to the
    // display box: negative for cover overflow, positive for letterboxing.
    let offset_x = (dw - iw * scale) / 2.0;
    let offset_y = (dh - ih * scale) / 2.0;

    let mut src_w = overlay.width / scale;
    let mut src_h = overlay.height / scale;
    if src_w > iw {
        src_w = iw;
    }
    if src_h > ih {
        src_h = ih;
    }

    let src_x = ((overlay.left - offset_x) / scale).clamp(0.0, iw - src_w);
    let src_y = ((overlay.top - offset_y) / scale).clamp(0.0, ih - src_h);

    let width = src_w.round() as u32;
    let height = src_h.round() as u32;
    if width == 0 || height == 0 {
        return Err(CaptureError::LayoutNotReady);
    }

    // Rounding may push the far edge one pixel past the frame; pull the
    // origin back instead of shrinking the crop.
    let x = (src_x.round() as u32).min(geometry.intrinsic_width - width);
    let y = (src_y.round() as u32).min(geometry.intrinsic_height - height);

    Ok(SourceRect {
        x,
        y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: f64, height: f64, fit: FitMode) -> ViewportLayout {
        ViewportLayout { width, height, fit }
    }

    fn centered_overlay(shape: StillShape, dw: f64, dh: f64, w: f64, h: f64) -> OverlayRegion {
        OverlayRegion {
            shape,
            left: (dw - w) / 2.0,
            top: (dh - h) / 2.0,
            width: w,
            height: h,
        }
    }

    fn assert_contained(rect: &SourceRect, geometry: &VideoGeometry) {
        assert!(rect.x + rect.width <= geometry.intrinsic_width, "{:?}", rect);
        assert!(rect.y + rect.height <= geometry.intrinsic_height, "{:?}", rect);
        assert!(rect.width > 0 && rect.height > 0, "{:?}", rect);
    }

    #[test]
    fn document_overlay_layout() {
        let spec = OverlaySpec::for_mode(CaptureMode::DocumentSide);
        let region = spec.layout(&viewport(320.0, 180.0, FitMode::Cover));
        assert_eq!(region.shape, StillShape::Rectangular);
        assert!((region.width - 272.0).abs() < 1e-9);
        assert!((region.height - 170.0).abs() < 1e-9);
        assert!((region.left - 24.0).abs() < 1e-9);
        assert!((region.top - 5.0).abs() < 1e-9);
    }

    #[test]
    fn document_overlay_respects_max_width() {
        let spec = OverlaySpec::for_mode(CaptureMode::DocumentSide);
        let region = spec.layout(&viewport(1000.0, 800.0, FitMode::Cover));
        assert!((region.width - 380.0).abs() < 1e-9);
    }

    #[test]
    fn document_overlay_never_overflows_a_short_viewport() {
        let spec = OverlaySpec::for_mode(CaptureMode::DocumentSide);
        let vp = viewport(1000.0, 100.0, FitMode::Cover);
        let region = spec.layout(&vp);
        assert!(region.height <= vp.height + 1e-9);
        assert!(region.top >= 0.0);
    }

    #[test]
    fn selfie_overlay_is_a_centered_circle() {
        let spec = OverlaySpec::for_mode(CaptureMode::Selfie);
        let region = spec.layout(&viewport(393.0, 660.0, FitMode::Cover));
        assert_eq!(region.shape, StillShape::Circular);
        assert!((region.width - 393.0 * 0.6).abs() < 1e-9);
        assert_eq!(region.width, region.height);
        // centered
        assert!((region.left * 2.0 + region.width - 393.0).abs() < 1e-9);
        assert!((region.top * 2.0 + region.height - 660.0).abs() < 1e-9);
    }

    // Spec scenario: exact aspect match, cover scale 0.25, end to end.
    #[test]
    fn crop_exact_aspect_match_cover() {
        let geometry = VideoGeometry::new(1280, 720, viewport(320.0, 180.0, FitMode::Cover));
        let overlay = OverlaySpec::for_mode(CaptureMode::DocumentSide).layout(&geometry.viewport);

        let rect = compute_source_crop(&geometry, &overlay).unwrap();
        assert_eq!(rect, SourceRect { x: 96, y: 20, width: 1088, height: 680 });
        assert_contained(&rect, &geometry);
    }

    // Cover with mismatched aspect: scale comes from the height axis and
    // the horizontal overflow must be added back.
    #[test]
    fn crop_scale_correctness_cover() {
        let geometry = VideoGeometry::new(1920, 1080, viewport(400.0, 300.0, FitMode::Cover));
        let overlay =
            centered_overlay(StillShape::Rectangular, 400.0, 300.0, 340.0, 212.5);

        let rect = compute_source_crop(&geometry, &overlay).unwrap();
        // scale = max(400/1920, 300/1080) = 300/1080
        assert_eq!(rect.width, 1224);
        assert_eq!(rect.height, 765);
        assert_eq!(rect.x, 348);
        assert_eq!(rect.y, 158);
        assert_contained(&rect, &geometry);
    }

    // Contain with the same inputs: scale flips to the width axis and the
    // vertical letterbox padding must be subtracted.
    #[test]
    fn crop_scale_correctness_contain() {
        let geometry = VideoGeometry::new(1920, 1080, viewport(400.0, 300.0, FitMode::Contain));
        let overlay =
            centered_overlay(StillShape::Rectangular, 400.0, 300.0, 340.0, 212.5);

        let rect = compute_source_crop(&geometry, &overlay).unwrap();
        // scale = min(400/1920, 300/1080) = 400/1920; padY = (300 - 225) / 2
        assert_eq!(rect.width, 1632);
        assert_eq!(rect.height, 1020);
        assert_eq!(rect.x, 144);
        assert_eq!(rect.y, 30);
        assert_contained(&rect, &geometry);
    }

    // Containment invariant across a spread of layouts, both fits, both
    // overlay shapes.
    #[test]
    fn crop_always_contained() {
        let intrinsics = [(1920, 1080), (1280, 720), (720, 1280), (640, 480), (3840, 2160)];
        let displays = [
            (320.0, 180.0),
            (393.0, 660.0),
            (1024.0, 768.0),
            (200.0, 1000.0),
            (1000.0, 120.0),
        ];
        for &(iw, ih) in &intrinsics {
            for &(dw, dh) in &displays {
                for fit in [FitMode::Cover, FitMode::Contain] {
                    for mode in [CaptureMode::DocumentSide, CaptureMode::Selfie] {
                        let geometry = VideoGeometry::new(iw, ih, viewport(dw, dh, fit));
                        let overlay = OverlaySpec::for_mode(mode).layout(&geometry.viewport);
                        let rect = compute_source_crop(&geometry, &overlay)
                            .unwrap_or_else(|e| panic!("{}x{} in {}x{}: {}", iw, ih, dw, dh, e));
                        assert_contained(&rect, &geometry);
                    }
                }
            }
        }
    }

    // An overlay that inverse-maps outside the frame is clamped, never
    // negative-origin or oversized.
    #[test]
    fn crop_clamps_oversized_overlay() {
        let geometry = VideoGeometry::new(640, 480, viewport(1000.0, 200.0, FitMode::Contain));
        let overlay = OverlayRegion {
            shape: StillShape::Rectangular,
            left: -100.0,
            top: -100.0,
            width: 1200.0,
            height: 400.0,
        };
        let rect = compute_source_crop(&geometry, &overlay).unwrap();
        assert_contained(&rect, &geometry);
        assert_eq!(rect.y, 0);
    }

    // A crop that rounds up to the full frame height must land at y = 0.
    #[test]
    fn crop_rounding_never_escapes_frame() {
        let geometry = VideoGeometry::new(1920, 1080, viewport(200.0, 1000.0, FitMode::Cover));
        let overlay = OverlayRegion {
            shape: StillShape::Rectangular,
            left: 0.0,
            top: 0.0,
            width: 200.0,
            height: 1000.0,
        };
        let rect = compute_source_crop(&geometry, &overlay).unwrap();
        assert_eq!(rect.y, 0);
        assert_eq!(rect.height, 1080);
        assert_contained(&rect, &geometry);
    }

    #[test]
    fn crop_refuses_degenerate_layout() {
        let geometry = VideoGeometry::new(1280, 720, viewport(320.0, 180.0, FitMode::Cover));
        let zero_overlay = OverlayRegion {
            shape: StillShape::Rectangular,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        };
        assert!(matches!(
            compute_source_crop(&geometry, &zero_overlay),
            Err(CaptureError::LayoutNotReady)
        ));

        let overlay = OverlaySpec::for_mode(CaptureMode::Selfie)
            .layout(&viewport(393.0, 660.0, FitMode::Cover));
        let unmeasured = VideoGeometry::new(1280, 720, viewport(0.0, 0.0, FitMode::Cover));
        assert!(matches!(
            compute_source_crop(&unmeasured, &overlay),
            Err(CaptureError::LayoutNotReady)
        ));

        let no_frame = VideoGeometry::new(0, 0, viewport(393.0, 660.0, FitMode::Cover));
        assert!(matches!(
            compute_source_crop(&no_frame, &overlay),
            Err(CaptureError::LayoutNotReady)
        ));
    }

    // Cropping the computed rect at 1:1 reproduces the overlay's on-screen
    // size up to the uniform scale, independent of device pixel ratio.
    #[test]
    fn crop_size_tracks_overlay_size() {
        for dpr in [1.0, 2.0, 3.0] {
            let geometry =
                VideoGeometry::new(1920, 1080, viewport(400.0 * dpr, 300.0 * dpr, FitMode::Cover));
            let overlay = OverlaySpec::for_mode(CaptureMode::Selfie).layout(&geometry.viewport);
            let rect = compute_source_crop(&geometry, &overlay).unwrap();
            let scale: f64 = (400.0 * dpr / 1920.0_f64).max(300.0 * dpr / 1080.0);
            let expected = (overlay.width / scale).round() as u32;
            assert_eq!(rect.width, expected, "dpr {}", dpr);
            assert_eq!(rect.height, rect.width);
        }
    }
}
