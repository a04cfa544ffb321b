//! IPC response types.

use serde::{Deserialize, Serialize};

use crate::types::{
    CountryInfo, DocumentTypeInfo, FlowStep, SessionPhase, StillShape, VerificationResult,
    VerificationStatus,
};

/// Snapshot of the wizard flow, as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub step: FlowStep,
    pub document_type: Option<String>,
    pub country: Option<String>,
    pub has_document_still: bool,
    pub has_selfie_still: bool,
    pub status: VerificationStatus,
}

/// Snapshot of the active capture session, as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Document-mode readiness signal gating the capture button
    pub document_ready: bool,
    /// Remaining selfie countdown tick, when one is running
    pub countdown: Option<u8>,
    /// Camera's native resolution, once known
    pub intrinsic: Option<(u32, u32)>,
    /// Whether a still is held for review
    pub has_still: bool,
}

/// IPC response from service to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    // === Catalogs ===
    /// Accepted document types
    DocumentTypes { types: Vec<DocumentTypeInfo> },
    /// Supported countries
    Countries { countries: Vec<CountryInfo> },

    // === Wizard flow ===
    /// Current wizard state
    FlowState(FlowSnapshot),

    // === Capture session ===
    /// Current capture session state
    SessionState(SessionSnapshot),
    /// No capture session is open
    NoSession,
    /// A still was captured and is held for review
    StillCaptured {
        width: u32,
        height: u32,
        shape: StillShape,
    },
    /// Base64 JPEG preview of a still
    Preview {
        data: String,
        width: u32,
        height: u32,
    },

    // === Verification ===
    /// Verification backend outcome
    VerificationOutcome { result: VerificationResult },

    // === Generic ===
    /// Generic success
    Ok,
    /// Pong response to ping
    Pong,
    /// Operation failed
    Error { message: String },
}

impl Response {
    /// Build an error response from anything displayable.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Response::Error {
            message: message.to_string(),
        }
    }
}
