//! IPC request handlers.
//!
//! One handler per request type; every handler answers with a Response and
//! reports failures as `Response::Error` rather than dropping the
//! connection.

use std::sync::Arc;
use tracing::{debug, error, info};

use vericap_common::constants;
use vericap_common::ipc::{Request, Response};

use crate::state::FlowManager;

/// Handle an IPC request and return a response.
pub async fn handle_request(state: &Arc<FlowManager>, request: Request) -> Response {
    debug!("Handling request: {:?}", request);

    match request {
        // === Catalogs ===
        Request::ListDocumentTypes => Response::DocumentTypes {
            types: constants::document_types(),
        },
        Request::ListCountries => Response::Countries {
            countries: constants::countries(),
        },

        // === Wizard flow ===
        Request::GetFlowState => Response::FlowState(state.flow_snapshot().await),
        Request::BeginFlow => match state.begin().await {
            Ok(()) => Response::FlowState(state.flow_snapshot().await),
            Err(e) => Response::error(e),
        },
        Request::SelectDocument {
            document_type,
            country,
        } => match state.select_document(&document_type, &country).await {
            Ok(()) => Response::FlowState(state.flow_snapshot().await),
            Err(e) => Response::error(e),
        },
        Request::StepBack => match state.step_back().await {
            Ok(()) => Response::FlowState(state.flow_snapshot().await),
            Err(e) => Response::error(e),
        },
        Request::ResetFlow => {
            state.reset().await;
            Response::FlowState(state.flow_snapshot().await)
        }

        // === Capture session ===
        Request::OpenSession { mode, viewport } => {
            info!("OpenSession: {:?}", mode);
            match state.open_session(mode, viewport).await {
                Ok(()) => Response::Ok,
                Err(e) => {
                    error!("Failed to open {:?} session: {}", mode, e);
                    Response::error(e)
                }
            }
        }
        Request::UpdateViewport { viewport } => match state.update_viewport(viewport).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e),
        },
        Request::GetSessionState => match state.session_snapshot().await {
            Some(snapshot) => Response::SessionState(snapshot),
            None => Response::NoSession,
        },
        Request::Capture => match state.capture().await {
            Ok((width, height, shape)) => Response::StillCaptured {
                width,
                height,
                shape,
            },
            Err(e) => Response::error(e),
        },
        Request::Retake => match state.retake().await {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e),
        },
        Request::Confirm => match state.confirm().await {
            Ok(()) => Response::FlowState(state.flow_snapshot().await),
            Err(e) => Response::error(e),
        },
        Request::CloseSession => {
            state.close_session().await;
            Response::Ok
        }
        Request::GetStillPreview { mode } => match state.still_preview(mode).await {
            Ok((data, width, height)) => Response::Preview {
                data,
                width,
                height,
            },
            Err(e) => Response::error(e),
        },

        // === Verification ===
        Request::Submit => {
            info!("Submitting verification");
            match state.submit().await {
                Ok(result) => Response::VerificationOutcome { result },
                Err(e) => {
                    error!("Verification submission failed: {}", e);
                    Response::error(e)
                }
            }
        }

        Request::GetResult => match state.result().await {
            Some(result) => Response::VerificationOutcome { result },
            None => Response::error("no verification result yet"),
        },

        // === Service control ===
        Request::Ping => Response::Pong,
        Request::Shutdown => {
            info!("Shutdown requested via IPC");
            crate::request_shutdown();
            Response::Ok
        }
    }
}
