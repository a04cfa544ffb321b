//! Shared types for the identity-verification capture flow.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a capture session is photographing.
///
/// The mode determines the overlay shape shown to the user (rectangle vs
/// circle), the camera facing direction, the requested resolution, and
/// whether an auto-capture countdown runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// One side of an identity document (rectangular guide, rear camera)
    DocumentSide,
    /// A self-portrait (circular guide, front camera)
    Selfie,
}

impl CaptureMode {
    /// Camera facing direction requested for this mode.
    pub fn facing(&self) -> FacingMode {
        match self {
            CaptureMode::DocumentSide => FacingMode::Environment,
            CaptureMode::Selfie => FacingMode::User,
        }
    }

    /// Ideal capture resolution hint (width, height).
    ///
    /// Documents request a larger frame to keep printed text legible;
    /// selfies get by with less.
    pub fn ideal_resolution(&self) -> (u32, u32) {
        match self {
            CaptureMode::DocumentSide => (1920, 1080),
            CaptureMode::Selfie => (1280, 720),
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" | "document_side" => Some(CaptureMode::DocumentSide),
            "selfie" => Some(CaptureMode::Selfie),
            _ => None,
        }
    }
}

/// Camera facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    Environment,
    /// Front camera, pointing at the user
    User,
}

/// How the camera frame is fitted into the on-screen video box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Frame fills the box; overflow is clipped (CSS `object-fit: cover`)
    #[default]
    Cover,
    /// Frame fits inside the box; remainder is letterboxed (`contain`)
    Contain,
}

/// The on-screen pixel box occupied by the video surface, as measured by
/// the client, plus the fit strategy in effect.
///
/// Sizes are in display pixels; they have no fixed relationship to the
/// camera's intrinsic resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportLayout {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub fit: FitMode,
}

/// Lifecycle phase of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Session created, camera not yet requested
    AwaitingPermission,
    /// Camera requested, waiting for the first frame
    StreamStarting,
    /// Stream delivering frames with known dimensions
    Live,
    /// Selfie auto-capture countdown in progress
    CountdownRunning,
    /// A capture attempt is in flight
    Capturing,
    /// A still is held, awaiting accept or retake
    Reviewing,
    /// Still accepted and handed off; session inert
    Confirmed,
    /// Camera access rejected; terminal
    PermissionDenied,
    /// Session torn down; terminal
    Closed,
}

/// Shape tag carried by a captured still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StillShape {
    Rectangular,
    Circular,
}

/// Ordinal step in the verification wizard.
///
/// Mirrors the page sequence of the flow: each step corresponds to one
/// screen the user moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    #[default]
    Landing,
    DocumentSelection,
    DocumentPreparation,
    DocumentCapture,
    SelfiePreparation,
    SelfieCapture,
    Processing,
    Complete,
}

impl FlowStep {
    /// Position of this step in the wizard, starting at 0.
    pub fn ordinal(&self) -> u8 {
        match self {
            FlowStep::Landing => 0,
            FlowStep::DocumentSelection => 1,
            FlowStep::DocumentPreparation => 2,
            FlowStep::DocumentCapture => 3,
            FlowStep::SelfiePreparation => 4,
            FlowStep::SelfieCapture => 5,
            FlowStep::Processing => 6,
            FlowStep::Complete => 7,
        }
    }

    /// The step after this one, if any.
    pub fn next(&self) -> Option<FlowStep> {
        match self {
            FlowStep::Landing => Some(FlowStep::DocumentSelection),
            FlowStep::DocumentSelection => Some(FlowStep::DocumentPreparation),
            FlowStep::DocumentPreparation => Some(FlowStep::DocumentCapture),
            FlowStep::DocumentCapture => Some(FlowStep::SelfiePreparation),
            FlowStep::SelfiePreparation => Some(FlowStep::SelfieCapture),
            FlowStep::SelfieCapture => Some(FlowStep::Processing),
            FlowStep::Processing => Some(FlowStep::Complete),
            FlowStep::Complete => None,
        }
    }

    /// The step before this one, if any.
    pub fn previous(&self) -> Option<FlowStep> {
        match self {
            FlowStep::Landing => None,
            FlowStep::DocumentSelection => Some(FlowStep::Landing),
            FlowStep::DocumentPreparation => Some(FlowStep::DocumentSelection),
            FlowStep::DocumentCapture => Some(FlowStep::DocumentPreparation),
            FlowStep::SelfiePreparation => Some(FlowStep::DocumentCapture),
            FlowStep::SelfieCapture => Some(FlowStep::SelfiePreparation),
            FlowStep::Processing => Some(FlowStep::SelfieCapture),
            FlowStep::Complete => Some(FlowStep::Processing),
        }
    }

    /// Display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            FlowStep::Landing => "Welcome",
            FlowStep::DocumentSelection => "Select document",
            FlowStep::DocumentPreparation => "Prepare document",
            FlowStep::DocumentCapture => "Document photo",
            FlowStep::SelfiePreparation => "Prepare selfie",
            FlowStep::SelfieCapture => "Selfie capture",
            FlowStep::Processing => "Verifying",
            FlowStep::Complete => "Complete",
        }
    }
}

/// Overall outcome state of the verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// No submission yet
    #[default]
    Pending,
    /// Backend accepted the document
    Verified,
    /// Backend rejected the document
    Failed,
}

/// A document type the user may verify with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeInfo {
    /// Stable identifier, e.g. "passport"
    pub id: String,
    /// Display label
    pub label: String,
    /// One-line description
    pub description: String,
}

/// A country the flow supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryInfo {
    /// ISO 3166-1 alpha-2 code
    pub code: String,
    /// Display name
    pub name: String,
}

/// One field the backend extracted from the document image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: String,
}

/// Structured result returned by the verification backend.
///
/// The capture core never interprets this beyond deserializing it; fields
/// the backend omits fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VerificationResult {
    #[serde(default)]
    pub document_valid: bool,
    #[serde(default)]
    pub extracted_fields: HashMap<String, ExtractedField>,
    #[serde(default)]
    pub id_type: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub is_face_match: bool,
    /// Face match confidence in 0..1, when the backend computed one
    #[serde(default)]
    pub face_match_confidence: Option<f64>,
    #[serde(default)]
    pub id_blob_url: Option<String>,
    #[serde(default)]
    pub selfie_blob_url: Option<String>,
}

impl VerificationResult {
    /// Convenience accessor for a named extracted field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.extracted_fields.get(name).map(|f| f.value.as_str())
    }
}
