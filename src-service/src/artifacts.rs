//! Saved capture artifacts.
//!
//! Confirmed stills are written to disk before submission so a failed
//! upload never loses a capture the user already approved.

use std::path::PathBuf;
use tracing::info;

use vericap_common::StillShape;

use crate::capture::CapturedStill;

/// The directory confirmed stills are written to.
fn captures_dir() -> PathBuf {
    let base = directories::ProjectDirs::from("", "", "vericap")
        .expect("Failed to determine project directories");
    base.data_local_dir().join("captures")
}

/// Write a still under the captures directory with a dated filename, e.g.
/// `document-2026-08-07_14-02-31.jpg`.
///
/// Rectangular stills are saved as their upload JPEG. Circular stills are
/// saved as PNG instead, from the masked pixel buffer, since JPEG cannot
/// keep the mask's transparency.
pub fn save_still(still: &CapturedStill, label: &str) -> std::io::Result<PathBuf> {
    let dir = captures_dir();
    std::fs::create_dir_all(&dir)?;

    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = match still.shape {
        StillShape::Rectangular => {
            let path = dir.join(format!("{}-{}.jpg", label, timestamp));
            std::fs::write(&path, &still.jpeg)?;
            path
        }
        StillShape::Circular => {
            let path = dir.join(format!("{}-{}.png", label, timestamp));
            let img = image::RgbaImage::from_raw(still.width, still.height, still.pixels.clone())
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "pixel buffer does not match dimensions",
                    )
                })?;
            img.save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            path
        }
    };

    info!("saved {} still to {}", label, path.display());
    Ok(path)
}
