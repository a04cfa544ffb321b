//! Still extraction: crop a live frame at 1:1, mask, and encode.

use image::{ImageBuffer, Rgba};
use vericap_common::StillShape;

use super::error::CaptureError;
use super::geometry::SourceRect;
use super::types::CapturedFrame;

/// JPEG quality for encoded stills (0-100). The backend performs OCR and
/// face matching on these, so quality stays high.
const JPEG_QUALITY: u8 = 90;

/// Immutable result of one capture.
///
/// `pixels` is the cropped RGBA buffer with the shape mask applied;
/// `jpeg` is the encoded artifact handed to the upload collaborator.
#[derive(Clone)]
pub struct CapturedStill {
    pub width: u32,
    pub height: u32,
    pub shape: StillShape,
    /// Masked RGBA pixels, `width * height * 4` bytes
    pub pixels: Vec<u8>,
    /// JPEG-encoded bytes at the configured quality
    pub jpeg: Vec<u8>,
}

impl std::fmt::Debug for CapturedStill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedStill")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("shape", &self.shape)
            .field("jpeg_bytes", &self.jpeg.len())
            .finish()
    }
}

/// Extract `source_rect` from `frame` at 1:1 scale and encode it.
///
/// The output buffer is sized exactly `source_rect.width × height`; no
/// rescaling happens at any point, so the still is pixel-for-pixel what the
/// user saw inside the guide. A circular shape masks pixels outside the
/// inscribed circle to fully transparent before encoding; the JPEG
/// composites those over black, matching a canvas export.
///
/// Refuses degenerate rectangles rather than producing a zero-area still.
pub fn extract_still(
    frame: &CapturedFrame,
    source_rect: &SourceRect,
    shape: StillShape,
) -> Result<CapturedStill, CaptureError> {
    if source_rect.width == 0 || source_rect.height == 0 {
        return Err(CaptureError::LayoutNotReady);
    }
    if source_rect.x + source_rect.width > frame.width
        || source_rect.y + source_rect.height > frame.height
    {
        return Err(CaptureError::InvalidState(format!(
            "crop {}x{}+{}+{} exceeds frame {}x{}",
            source_rect.width,
            source_rect.height,
            source_rect.x,
            source_rect.y,
            frame.width,
            frame.height
        )));
    }

    let mut pixels = crop_rgba(
        &frame.data,
        frame.width,
        source_rect.x,
        source_rect.y,
        source_rect.width,
        source_rect.height,
    );

    if shape == StillShape::Circular {
        apply_circular_mask(&mut pixels, source_rect.width, source_rect.height);
    }

    let jpeg = encode_jpeg(&pixels, source_rect.width, source_rect.height)?;

    Ok(CapturedStill {
        width: source_rect.width,
        height: source_rect.height,
        shape,
        pixels,
        jpeg,
    })
}

/// Crop an RGBA buffer to the given region, row by row.
///
/// The caller guarantees the region lies within the frame.
fn crop_rgba(data: &[u8], frame_width: u32, x: u32, y: u32, width: u32, height: u32) -> Vec<u8> {
    let row_bytes = (width as usize) * 4;
    let mut out = Vec::with_capacity(row_bytes * height as usize);

    for row in 0..height {
        let src_start = (((y + row) * frame_width + x) as usize) * 4;
        let src_end = src_start + row_bytes;
        if src_end <= data.len() {
            out.extend_from_slice(&data[src_start..src_end]);
        } else {
            // Short source buffer; pad with opaque black
            out.extend(std::iter::repeat(0u8).take(row_bytes));
        }
    }

    out
}

/// Zero out every pixel whose center lies outside the circle inscribed in
/// the buffer (diameter = min(width, height), centered).
fn apply_circular_mask(pixels: &mut [u8], width: u32, height: u32) {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let radius = width.min(height) as f64 / 2.0;
    let radius_sq = radius * radius;

    for row in 0..height {
        for col in 0..width {
            let dx = (col as f64 + 0.5) - cx;
            let dy = (row as f64 + 0.5) - cy;
            if dx * dx + dy * dy > radius_sq {
                let i = ((row * width + col) as usize) * 4;
                pixels[i..i + 4].copy_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
}

/// Encode RGBA pixels as JPEG at the configured quality.
///
/// JPEG has no alpha channel; transparent (masked) pixels come out black.
fn encode_jpeg(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, pixels.to_vec()).ok_or_else(|| {
            CaptureError::EncodingFailed("pixel buffer does not match dimensions".to_string())
        })?;

    let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();

    let mut jpeg_bytes: Vec<u8> = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;

    Ok(jpeg_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 RGBA frame with the pixel index baked into each channel.
    fn indexed_frame() -> CapturedFrame {
        let mut data = Vec::new();
        for i in 0u8..16 {
            data.extend_from_slice(&[i, i, i, 255]);
        }
        CapturedFrame {
            width: 4,
            height: 4,
            data,
        }
    }

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> CapturedFrame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        CapturedFrame {
            width,
            height,
            data,
        }
    }

    fn alpha_at(still: &CapturedStill, x: u32, y: u32) -> u8 {
        still.pixels[((y * still.width + x) as usize) * 4 + 3]
    }

    #[test]
    fn test_crop_rgba_basic() {
        let frame = indexed_frame();

        // Crop a 2x2 region starting at (1, 1)
        let cropped = crop_rgba(&frame.data, 4, 1, 1, 2, 2);

        assert_eq!(cropped.len(), 2 * 2 * 4);
        assert_eq!(cropped[0..4], [5, 5, 5, 255]); // Pixel (1,1) = index 5
        assert_eq!(cropped[4..8], [6, 6, 6, 255]); // Pixel (2,1) = index 6
        assert_eq!(cropped[8..12], [9, 9, 9, 255]); // Pixel (1,2) = index 9
        assert_eq!(cropped[12..16], [10, 10, 10, 255]); // Pixel (2,2) = index 10
    }

    #[test]
    fn rectangular_still_is_fully_opaque() {
        let frame = solid_frame(8, 6, [10, 20, 30, 255]);
        let rect = SourceRect { x: 1, y: 1, width: 6, height: 4 };
        let still = extract_still(&frame, &rect, StillShape::Rectangular).unwrap();

        assert_eq!((still.width, still.height), (6, 4));
        assert_eq!(still.pixels.len(), 6 * 4 * 4);
        assert!(still.pixels.chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
        assert!(!still.jpeg.is_empty());
    }

    // Circular mask: distance > r transparent, <= r untouched, sampled at
    // corners, center, edge midpoints, and just-inside/just-outside points.
    #[test]
    fn circular_mask_transparency() {
        let frame = solid_frame(300, 300, [200, 200, 200, 255]);
        let rect = SourceRect { x: 0, y: 0, width: 300, height: 300 };
        let still = extract_still(&frame, &rect, StillShape::Circular).unwrap();

        // Outside the circle
        for (x, y) in [(0, 0), (299, 0), (0, 299), (299, 299), (10, 10), (280, 20)] {
            assert_eq!(alpha_at(&still, x, y), 0, "({}, {}) should be masked", x, y);
        }
        // Inside the circle
        for (x, y) in [(150, 150), (150, 5), (5, 150), (150, 294), (100, 100), (200, 200)] {
            assert_eq!(alpha_at(&still, x, y), 255, "({}, {}) should be kept", x, y);
        }
    }

    #[test]
    fn circular_mask_on_landscape_buffer_uses_min_dimension() {
        let frame = solid_frame(40, 20, [9, 9, 9, 255]);
        let rect = SourceRect { x: 0, y: 0, width: 40, height: 20 };
        let still = extract_still(&frame, &rect, StillShape::Circular).unwrap();

        // Circle of diameter 20 centered at (20, 10): far left/right masked
        assert_eq!(alpha_at(&still, 0, 10), 0);
        assert_eq!(alpha_at(&still, 39, 10), 0);
        assert_eq!(alpha_at(&still, 20, 10), 255);
        assert_eq!(alpha_at(&still, 12, 10), 255);
    }

    #[test]
    fn refuses_zero_area_rect() {
        let frame = solid_frame(8, 8, [0, 0, 0, 255]);
        let rect = SourceRect { x: 0, y: 0, width: 0, height: 0 };
        assert!(matches!(
            extract_still(&frame, &rect, StillShape::Rectangular),
            Err(CaptureError::LayoutNotReady)
        ));
    }

    #[test]
    fn refuses_out_of_bounds_rect() {
        let frame = solid_frame(8, 8, [0, 0, 0, 255]);
        let rect = SourceRect { x: 4, y: 4, width: 8, height: 8 };
        assert!(matches!(
            extract_still(&frame, &rect, StillShape::Rectangular),
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[test]
    fn jpeg_decodes_back_to_same_dimensions() {
        let frame = solid_frame(64, 40, [120, 80, 40, 255]);
        let rect = SourceRect { x: 8, y: 4, width: 48, height: 32 };
        let still = extract_still(&frame, &rect, StillShape::Rectangular).unwrap();

        let decoded = image::load_from_memory(&still.jpeg).unwrap();
        assert_eq!(decoded.width(), 48);
        assert_eq!(decoded.height(), 32);
    }
}
