//! Flow state management for the VeriCap service.
//!
//! The manager owns the wizard context and the active capture session,
//! gates session lifecycle on the wizard step, and drives submission to
//! the verification backend. There is exactly one active capture session
//! at a time; opening a new one tears down the old.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use vericap_common::ipc::{FlowSnapshot, SessionSnapshot};
use vericap_common::{CaptureMode, StillShape, VerificationResult, ViewportLayout};

use crate::artifacts;
use crate::capture::{CameraBackend, CaptureSession, DetectorPort};
use crate::verify::VerifyClient;
use crate::wizard::FlowContext;

/// Service-level state: one wizard flow plus at most one capture session.
pub struct FlowManager {
    flow: Mutex<FlowContext>,
    session: Mutex<Option<Arc<CaptureSession>>>,
    camera: Arc<dyn CameraBackend>,
    detector: Arc<dyn DetectorPort>,
    verifier: VerifyClient,
}

impl FlowManager {
    pub fn new(
        camera: Arc<dyn CameraBackend>,
        detector: Arc<dyn DetectorPort>,
        verifier: VerifyClient,
    ) -> Self {
        Self {
            flow: Mutex::new(FlowContext::new()),
            session: Mutex::new(None),
            camera,
            detector,
            verifier,
        }
    }

    /// Current wizard state.
    pub async fn flow_snapshot(&self) -> FlowSnapshot {
        self.flow.lock().await.snapshot()
    }

    /// Current capture session state, if a session is open.
    pub async fn session_snapshot(&self) -> Option<SessionSnapshot> {
        let session = self.session.lock().await.clone();
        match session {
            Some(session) => Some(session.snapshot().await),
            None => None,
        }
    }

    /// Leave the landing page.
    pub async fn begin(&self) -> Result<(), String> {
        self.flow.lock().await.begin().map_err(|e| e.to_string())
    }

    /// Record the document choice.
    pub async fn select_document(&self, document_type: &str, country: &str) -> Result<(), String> {
        self.flow
            .lock()
            .await
            .select_document(document_type, country)
            .map_err(|e| e.to_string())?;
        info!("document selected: {} ({})", document_type, country);
        Ok(())
    }

    /// Step back one wizard page. Any open session is torn down first.
    pub async fn step_back(&self) -> Result<(), String> {
        self.teardown_session().await;
        let mut flow = self.flow.lock().await;
        flow.back().map_err(|e| e.to_string())?;
        info!("stepped back to {:?}", flow.step());
        Ok(())
    }

    /// Result of a completed verification, if one happened.
    pub async fn result(&self) -> Option<VerificationResult> {
        self.flow.lock().await.result().cloned()
    }

    /// Abandon the flow entirely.
    pub async fn reset(&self) {
        self.teardown_session().await;
        self.flow.lock().await.reset();
        info!("flow reset");
    }

    /// Open a capture session for a mode, gated on the wizard step.
    ///
    /// A camera denial is reported once; the terminal session is kept so
    /// clients can observe the `PermissionDenied` phase and decide what to
    /// do.
    pub async fn open_session(
        &self,
        mode: CaptureMode,
        viewport: ViewportLayout,
    ) -> Result<(), String> {
        self.flow
            .lock()
            .await
            .enter_capture(mode)
            .map_err(|e| e.to_string())?;

        self.teardown_session().await;

        let session = CaptureSession::new(
            mode,
            viewport,
            Arc::clone(&self.camera),
            Arc::clone(&self.detector),
        );
        let open_result = session.open().await;
        {
            let mut slot = self.session.lock().await;
            *slot = Some(Arc::clone(&session));
        }
        match open_result {
            Ok(()) => {
                info!("{:?} capture session opened", mode);
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Report a changed video-surface layout to the active session.
    pub async fn update_viewport(&self, viewport: ViewportLayout) -> Result<(), String> {
        let session = self.active_session().await?;
        session.update_viewport(viewport).await;
        Ok(())
    }

    /// Trigger a capture on the active session.
    pub async fn capture(&self) -> Result<(u32, u32, StillShape), String> {
        let session = self.active_session().await?;
        session.capture().await.map_err(|e| e.to_string())?;
        session
            .still_info()
            .await
            .ok_or_else(|| "capture produced no still".to_string())
    }

    /// Discard the held still and restart the camera.
    pub async fn retake(&self) -> Result<(), String> {
        let session = self.active_session().await?;
        session.retake().await.map_err(|e| e.to_string())
    }

    /// Accept the held still: it moves into the wizard context and the
    /// session is torn down.
    pub async fn confirm(&self) -> Result<(), String> {
        let session = self.active_session().await?;
        let mode = session.mode();
        let still = session.confirm().await.map_err(|e| e.to_string())?;

        self.flow
            .lock()
            .await
            .attach_still(mode, still)
            .map_err(|e| e.to_string())?;

        let mut slot = self.session.lock().await;
        *slot = None;
        info!("{:?} still confirmed", mode);
        Ok(())
    }

    /// Tear down the active session, if any.
    pub async fn close_session(&self) {
        self.teardown_session().await;
    }

    /// Base64 JPEG preview of a confirmed still.
    pub async fn still_preview(&self, mode: CaptureMode) -> Result<(String, u32, u32), String> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let flow = self.flow.lock().await;
        let still = flow
            .still(mode)
            .ok_or_else(|| format!("no confirmed {:?} still", mode))?;
        Ok((STANDARD.encode(&still.jpeg), still.width, still.height))
    }

    /// Submit both stills to the verification backend.
    pub async fn submit(&self) -> Result<VerificationResult, String> {
        let mut flow = self.flow.lock().await;
        let result = {
            let (document, selfie) = flow.submission_payload().map_err(|e| e.to_string())?;

            // Keep the approved captures even if the upload fails.
            if let Err(e) = artifacts::save_still(document, "document") {
                warn!("failed to save document still: {}", e);
            }
            if let Err(e) = artifacts::save_still(selfie, "selfie") {
                warn!("failed to save selfie still: {}", e);
            }

            self.verifier
                .submit(document, selfie)
                .await
                .map_err(|e| e.to_string())?
        };

        flow.complete(result.clone());
        info!(
            "verification complete: {:?} (face_match={})",
            flow.status(),
            result.is_face_match
        );
        Ok(result)
    }

    async fn active_session(&self) -> Result<Arc<CaptureSession>, String> {
        self.session
            .lock()
            .await
            .clone()
            .ok_or_else(|| "no capture session open".to_string())
    }

    async fn teardown_session(&self) {
        let session = {
            let mut slot = self.session.lock().await;
            slot.take()
        };
        if let Some(session) = session {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ContrastDetector, SimCamera};
    use vericap_common::{FitMode, FlowStep, SessionPhase};

    fn manager() -> FlowManager {
        FlowManager::new(
            Arc::new(SimCamera::new()),
            Arc::new(ContrastDetector::new()),
            VerifyClient::new("https://kyc.invalid", None),
        )
    }

    fn viewport() -> ViewportLayout {
        ViewportLayout {
            width: 393.0,
            height: 660.0,
            fit: FitMode::Cover,
        }
    }

    async fn wait_for_session_phase(manager: &FlowManager, wanted: SessionPhase) {
        tokio::time::timeout(std::time::Duration::from_secs(30), async {
            loop {
                if let Some(snapshot) = manager.session_snapshot().await {
                    if snapshot.phase == wanted {
                        return;
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("session never reached {:?}", wanted));
    }

    async fn wait_for_document_ready(manager: &FlowManager) {
        tokio::time::timeout(std::time::Duration::from_secs(30), async {
            loop {
                if let Some(snapshot) = manager.session_snapshot().await {
                    if snapshot.document_ready {
                        return;
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            }
        })
        .await
        .expect("detector never reported ready");
    }

    #[tokio::test(start_paused = true)]
    async fn session_opening_is_gated_on_wizard_step() {
        let manager = manager();
        // Still on the landing page: no capture allowed.
        assert!(manager
            .open_session(CaptureMode::DocumentSide, viewport())
            .await
            .is_err());
        assert!(manager.session_snapshot().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn document_capture_feeds_the_wizard() {
        let manager = manager();
        manager.begin().await.unwrap();
        manager.select_document("passport", "IN").await.unwrap();

        manager
            .open_session(CaptureMode::DocumentSide, viewport())
            .await
            .unwrap();
        wait_for_session_phase(&manager, SessionPhase::Live).await;
        wait_for_document_ready(&manager).await;

        let (width, height, shape) = manager.capture().await.unwrap();
        assert!(width > 0 && height > 0);
        assert_eq!(shape, StillShape::Rectangular);

        manager.confirm().await.unwrap();
        let flow = manager.flow_snapshot().await;
        assert_eq!(flow.step, FlowStep::SelfiePreparation);
        assert!(flow.has_document_still);
        // Session slot cleared after confirm
        assert!(manager.session_snapshot().await.is_none());

        let (preview, width, _) = manager
            .still_preview(CaptureMode::DocumentSide)
            .await
            .unwrap();
        assert!(!preview.is_empty());
        assert!(width > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn selfie_session_auto_captures_through_the_manager() {
        let manager = manager();
        manager.begin().await.unwrap();
        manager.select_document("passport", "IN").await.unwrap();
        manager
            .open_session(CaptureMode::DocumentSide, viewport())
            .await
            .unwrap();
        wait_for_session_phase(&manager, SessionPhase::Live).await;
        wait_for_document_ready(&manager).await;
        manager.capture().await.unwrap();
        manager.confirm().await.unwrap();

        manager
            .open_session(CaptureMode::Selfie, viewport())
            .await
            .unwrap();
        wait_for_session_phase(&manager, SessionPhase::Reviewing).await;
        manager.confirm().await.unwrap();

        let flow = manager.flow_snapshot().await;
        assert_eq!(flow.step, FlowStep::Processing);
        assert!(flow.has_selfie_still);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_tears_down_the_session() {
        let manager = manager();
        manager.begin().await.unwrap();
        manager.select_document("pan-card", "IN").await.unwrap();
        manager
            .open_session(CaptureMode::DocumentSide, viewport())
            .await
            .unwrap();
        wait_for_session_phase(&manager, SessionPhase::Live).await;

        manager.reset().await;
        assert!(manager.session_snapshot().await.is_none());
        assert_eq!(manager.flow_snapshot().await.step, FlowStep::Landing);
    }

    #[tokio::test]
    async fn submit_requires_both_stills() {
        let manager = manager();
        assert!(manager.submit().await.is_err());
    }
}
