//! IPC request types.

use serde::{Deserialize, Serialize};

use crate::types::{CaptureMode, ViewportLayout};
use crate::validation::{
    validate_country, validate_document_type, validate_viewport, ValidationError,
};

/// IPC request from client to service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    // === Catalogs ===
    /// List accepted document types
    ListDocumentTypes,
    /// List supported countries
    ListCountries,

    // === Wizard flow ===
    /// Get current wizard state
    GetFlowState,
    /// Leave the landing step and begin the flow
    BeginFlow,
    /// Choose document type and country
    SelectDocument {
        document_type: String,
        country: String,
    },
    /// Step back one wizard page
    StepBack,
    /// Abandon the flow and return to the landing step
    ResetFlow,

    // === Capture session ===
    /// Open a capture session for the given mode
    OpenSession {
        mode: CaptureMode,
        viewport: ViewportLayout,
    },
    /// Report a changed video-surface layout (resize, rotation)
    UpdateViewport { viewport: ViewportLayout },
    /// Get current capture session state
    GetSessionState,
    /// Trigger a capture (document mode; selfies capture automatically)
    Capture,
    /// Discard the held still and restart the camera
    Retake,
    /// Accept the held still and advance the wizard
    Confirm,
    /// Tear down the capture session
    CloseSession,
    /// Get a base64 JPEG preview of a confirmed still
    GetStillPreview { mode: CaptureMode },

    // === Verification ===
    /// Submit both stills to the verification backend
    Submit,
    /// Re-fetch the result of a completed verification
    GetResult,

    // === Service control ===
    /// Liveness check
    Ping,
    /// Ask the service to exit
    Shutdown,
}

impl Request {
    /// Validate request parameters before dispatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Request::SelectDocument {
                document_type,
                country,
            } => {
                validate_document_type(document_type)?;
                validate_country(country)
            }
            Request::OpenSession { viewport, .. } => validate_viewport(viewport),
            Request::UpdateViewport { viewport } => validate_viewport(viewport),
            _ => Ok(()),
        }
    }
}
