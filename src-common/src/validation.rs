//! Input validation for IPC request parameters.
//!
//! All client-supplied values are validated before a request is dispatched,
//! so handlers can assume well-formed input.

use crate::constants;
use crate::types::ViewportLayout;

/// Largest viewport dimension we accept, in display pixels.
pub const MAX_VIEWPORT_DIMENSION: f64 = 16384.0;

/// Error produced by request validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Viewport dimensions are non-finite, non-positive, or implausibly large
    InvalidViewport(String),
    /// Unknown document type identifier
    UnknownDocumentType(String),
    /// Unknown country code
    UnknownCountry(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidViewport(msg) => write!(f, "invalid viewport: {}", msg),
            ValidationError::UnknownDocumentType(id) => {
                write!(f, "unknown document type: {}", id)
            }
            ValidationError::UnknownCountry(code) => write!(f, "unknown country: {}", code),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a client-measured viewport.
///
/// A zero-sized viewport is accepted: it means the client's layout has not
/// settled yet, and the service absorbs that as a transient condition.
pub fn validate_viewport(viewport: &ViewportLayout) -> Result<(), ValidationError> {
    if !viewport.width.is_finite() || !viewport.height.is_finite() {
        return Err(ValidationError::InvalidViewport(
            "dimensions must be finite".to_string(),
        ));
    }
    if viewport.width < 0.0 || viewport.height < 0.0 {
        return Err(ValidationError::InvalidViewport(format!(
            "negative dimensions: {}x{}",
            viewport.width, viewport.height
        )));
    }
    if viewport.width > MAX_VIEWPORT_DIMENSION || viewport.height > MAX_VIEWPORT_DIMENSION {
        return Err(ValidationError::InvalidViewport(format!(
            "dimensions exceed {} px: {}x{}",
            MAX_VIEWPORT_DIMENSION, viewport.width, viewport.height
        )));
    }
    Ok(())
}

/// Validate a document type identifier against the catalog.
pub fn validate_document_type(id: &str) -> Result<(), ValidationError> {
    if constants::is_known_document_type(id) {
        Ok(())
    } else {
        Err(ValidationError::UnknownDocumentType(id.to_string()))
    }
}

/// Validate a country code against the catalog.
pub fn validate_country(code: &str) -> Result<(), ValidationError> {
    if constants::is_known_country(code) {
        Ok(())
    } else {
        Err(ValidationError::UnknownCountry(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FitMode;

    fn viewport(width: f64, height: f64) -> ViewportLayout {
        ViewportLayout {
            width,
            height,
            fit: FitMode::Cover,
        }
    }

    #[test]
    fn accepts_normal_and_zero_viewports() {
        assert!(validate_viewport(&viewport(393.0, 660.0)).is_ok());
        // Zero means "layout not settled", which the service handles itself.
        assert!(validate_viewport(&viewport(0.0, 0.0)).is_ok());
    }

    #[test]
    fn rejects_bad_viewports() {
        assert!(validate_viewport(&viewport(-1.0, 100.0)).is_err());
        assert!(validate_viewport(&viewport(f64::NAN, 100.0)).is_err());
        assert!(validate_viewport(&viewport(1e9, 100.0)).is_err());
    }

    #[test]
    fn checks_catalogs() {
        assert!(validate_document_type("pan-card").is_ok());
        assert!(validate_document_type("npm-package").is_err());
        assert!(validate_country("DE").is_ok());
        assert!(validate_country("XX").is_err());
    }
}
