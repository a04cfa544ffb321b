//! Capture session lifecycle.
//!
//! One session covers a single capture interaction: acquire the camera,
//! go live, (for selfies) run the auto-capture countdown, capture, hold the
//! still for accept/retake, and tear the stream down. All state lives
//! behind the session's own locks; timers are owned tasks that are aborted,
//! not merely ignored, whenever the session leaves the phase they belong
//! to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vericap_common::{CaptureMode, SessionPhase, ViewportLayout};
use vericap_common::ipc::SessionSnapshot;

use super::detector::DetectorPort;
use super::error::CaptureError;
use super::geometry::{compute_source_crop, OverlaySpec, VideoGeometry};
use super::still::{extract_still, CapturedStill};
use super::types::{CapturedFrame, FrameReceiver, MediaStreamHandle, StreamRequest};
use super::CameraBackend;

/// Delay between going live and arming the selfie countdown.
const AUTO_CAPTURE_DELAY: Duration = Duration::from_millis(1500);
/// Length of one countdown tick.
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
/// Number of countdown ticks before the selfie fires.
const COUNTDOWN_TICKS: u8 = 3;
/// Document-readiness polling interval while live.
const DETECT_INTERVAL: Duration = Duration::from_secs(1);
/// Pause between capture retries while waiting out a layout race.
const CAPTURE_RETRY_INTERVAL: Duration = Duration::from_millis(40);
/// Capture attempts before a layout race is reported to the caller.
const CAPTURE_RETRY_LIMIT: u32 = 10;

/// Events broadcast to session observers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Lifecycle phase changed
    PhaseChanged(SessionPhase),
    /// Selfie countdown tick (remaining seconds)
    CountdownTick(u8),
    /// Document readiness signal changed
    DocumentReady(bool),
    /// A still was captured and is held for review
    StillCaptured { width: u32, height: u32 },
}

/// A single document-or-selfie capture interaction.
///
/// Sessions live behind an `Arc`; spawned timer and pump tasks hold a
/// clone so they can reach back in, and every task exits on its own when
/// the session leaves the phase it serves, so no task outlives its purpose
/// even if an abort is missed.
pub struct CaptureSession {
    mode: CaptureMode,
    camera: Arc<dyn CameraBackend>,
    detector: Arc<dyn DetectorPort>,
    weak_self: Weak<CaptureSession>,

    phase: RwLock<SessionPhase>,
    viewport: RwLock<ViewportLayout>,
    stream: Mutex<Option<MediaStreamHandle>>,
    latest_frame: Mutex<Option<CapturedFrame>>,
    still: Mutex<Option<CapturedStill>>,
    countdown_left: Mutex<Option<u8>>,

    capture_busy: AtomicBool,
    document_ready: AtomicBool,

    pump_task: Mutex<Option<JoinHandle<()>>>,
    countdown_task: Mutex<Option<JoinHandle<()>>>,
    detect_task: Mutex<Option<JoinHandle<()>>>,

    event_tx: broadcast::Sender<SessionEvent>,
}

impl CaptureSession {
    /// Create a session; the camera is not touched until [`open`].
    ///
    /// [`open`]: CaptureSession::open
    pub fn new(
        mode: CaptureMode,
        viewport: ViewportLayout,
        camera: Arc<dyn CameraBackend>,
        detector: Arc<dyn DetectorPort>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new_cyclic(|weak| Self {
            mode,
            camera,
            detector,
            weak_self: weak.clone(),
            phase: RwLock::new(SessionPhase::AwaitingPermission),
            viewport: RwLock::new(viewport),
            stream: Mutex::new(None),
            latest_frame: Mutex::new(None),
            still: Mutex::new(None),
            countdown_left: Mutex::new(None),
            capture_busy: AtomicBool::new(false),
            document_ready: AtomicBool::new(false),
            pump_task: Mutex::new(None),
            countdown_task: Mutex::new(None),
            detect_task: Mutex::new(None),
            event_tx,
        })
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// A strong handle to hand to spawned tasks. While `&self` exists the
    /// strong count is nonzero, so the upgrade cannot fail.
    fn arc(&self) -> Arc<Self> {
        self.weak_self.upgrade().expect("session dropped")
    }

    /// Subscribe to session events.
    #[allow(dead_code)] // Event streaming is not exposed over IPC yet
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: SessionEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(event);
    }

    async fn set_phase(&self, new_phase: SessionPhase) {
        {
            let mut phase = self.phase.write().await;
            *phase = new_phase;
        }
        debug!("session phase -> {:?}", new_phase);
        self.broadcast(SessionEvent::PhaseChanged(new_phase));
    }

    /// Current session state, for IPC reporting.
    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: *self.phase.read().await,
            document_ready: self.document_ready.load(Ordering::Relaxed),
            countdown: *self.countdown_left.lock().await,
            intrinsic: self
                .latest_frame
                .lock()
                .await
                .as_ref()
                .map(|f| (f.width, f.height)),
            has_still: self.has_still().await,
        }
    }

    /// Whether a still is currently held for review.
    pub async fn has_still(&self) -> bool {
        self.still.lock().await.is_some()
    }

    /// Dimensions and shape of the held still, if any.
    pub async fn still_info(&self) -> Option<(u32, u32, vericap_common::StillShape)> {
        self.still
            .lock()
            .await
            .as_ref()
            .map(|s| (s.width, s.height, s.shape))
    }

    /// Report a changed video-surface layout.
    pub async fn update_viewport(&self, viewport: ViewportLayout) {
        *self.viewport.write().await = viewport;
    }

    /// Request camera access and start streaming.
    ///
    /// A rejection is terminal for the session and is never retried here;
    /// the user decides whether to start over.
    pub async fn open(&self) -> Result<(), CaptureError> {
        {
            let phase = *self.phase.read().await;
            if phase != SessionPhase::AwaitingPermission {
                return Err(CaptureError::InvalidState(format!(
                    "cannot open in {:?}",
                    phase
                )));
            }
        }
        self.start_stream().await
    }

    async fn start_stream(&self) -> Result<(), CaptureError> {
        self.set_phase(SessionPhase::StreamStarting).await;

        let request = StreamRequest::for_mode(self.mode);
        match self.camera.start_stream(&request) {
            Ok((frame_rx, stop_flag)) => {
                {
                    let mut stream = self.stream.lock().await;
                    *stream = Some(MediaStreamHandle::new(stop_flag));
                }
                let session = self.arc();
                let handle = tokio::spawn(async move { session.run_pump(frame_rx).await });
                *self.pump_task.lock().await = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!("camera acquisition failed: {}", e);
                self.set_phase(SessionPhase::PermissionDenied).await;
                Err(e)
            }
        }
    }

    /// Frame pump: stores the newest frame and drives StreamStarting → Live
    /// once the stream reports usable dimensions.
    async fn run_pump(self: Arc<Self>, mut frame_rx: FrameReceiver) {
        let mut went_live = false;
        while let Some(frame) = frame_rx.recv().await {
            if frame.width == 0 || frame.height == 0 {
                continue;
            }
            {
                let mut latest = self.latest_frame.lock().await;
                *latest = Some(frame);
            }
            if !went_live {
                went_live = true;
                let starting = *self.phase.read().await == SessionPhase::StreamStarting;
                if starting {
                    self.set_phase(SessionPhase::Live).await;
                    match self.mode {
                        CaptureMode::Selfie => self.spawn_countdown().await,
                        CaptureMode::DocumentSide => self.spawn_detector().await,
                    }
                }
            }
        }
        debug!("frame pump ended");
    }

    /// Selfie auto-capture: fixed delay, then a 3-tick countdown, then
    /// capture. Bails out silently the moment the session leaves the phase
    /// the countdown belongs to.
    async fn spawn_countdown(&self) {
        let session = self.arc();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(AUTO_CAPTURE_DELAY).await;
            if *session.phase.read().await != SessionPhase::Live {
                return;
            }
            session.set_phase(SessionPhase::CountdownRunning).await;
            for tick in (1..=COUNTDOWN_TICKS).rev() {
                if *session.phase.read().await != SessionPhase::CountdownRunning {
                    return;
                }
                *session.countdown_left.lock().await = Some(tick);
                session.broadcast(SessionEvent::CountdownTick(tick));
                tokio::time::sleep(COUNTDOWN_TICK).await;
            }
            if *session.phase.read().await != SessionPhase::CountdownRunning {
                return;
            }
            *session.countdown_left.lock().await = None;
            if let Err(e) = session.capture().await {
                warn!("auto-capture failed: {}", e);
            }
        });
        *self.countdown_task.lock().await = Some(handle);
    }

    /// Document-readiness poll while live.
    async fn spawn_detector(&self) {
        let session = self.arc();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(DETECT_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match *session.phase.read().await {
                    SessionPhase::Live => {}
                    // A capture in flight pauses polling without ending it
                    SessionPhase::Capturing => continue,
                    _ => break,
                }

                let frame = session.latest_frame.lock().await.clone();
                let viewport = *session.viewport.read().await;
                let Some(frame) = frame else { continue };

                let geometry = VideoGeometry::new(frame.width, frame.height, viewport);
                let overlay = OverlaySpec::for_mode(session.mode).layout(&viewport);
                let ready = session.detector.assess(&frame, &geometry, &overlay);

                let previous = session.document_ready.swap(ready, Ordering::Relaxed);
                if previous != ready {
                    session.broadcast(SessionEvent::DocumentReady(ready));
                }
            }
        });
        *self.detect_task.lock().await = Some(handle);
    }

    /// Capture a still from the current frame through the geometry engine.
    ///
    /// Document mode requires the readiness signal; a second capture while
    /// one is in flight is refused. Layout races are waited out against
    /// subsequent frames before being reported; a failed capture returns
    /// the session to `Live`.
    pub async fn capture(&self) -> Result<(), CaptureError> {
        {
            let phase = *self.phase.read().await;
            if !matches!(
                phase,
                SessionPhase::Live | SessionPhase::CountdownRunning
            ) {
                return Err(CaptureError::InvalidState(format!(
                    "cannot capture in {:?}",
                    phase
                )));
            }
        }
        if self.mode == CaptureMode::DocumentSide
            && !self.document_ready.load(Ordering::Relaxed)
        {
            return Err(CaptureError::NotReady("no document framed".to_string()));
        }
        if self
            .capture_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::CaptureInProgress);
        }

        self.set_phase(SessionPhase::Capturing).await;
        *self.countdown_left.lock().await = None;

        let result = self.acquire_still().await;
        self.capture_busy.store(false, Ordering::SeqCst);

        match result {
            Ok(still) => {
                let (width, height) = (still.width, still.height);
                {
                    // Previous still from an earlier cycle, if any, is discarded
                    let mut held = self.still.lock().await;
                    *held = Some(still);
                }
                self.set_phase(SessionPhase::Reviewing).await;
                self.broadcast(SessionEvent::StillCaptured { width, height });
                info!("captured {}x{} still", width, height);
                Ok(())
            }
            Err(e) => {
                warn!("capture failed: {}", e);
                self.set_phase(SessionPhase::Live).await;
                Err(e)
            }
        }
    }

    async fn acquire_still(&self) -> Result<CapturedStill, CaptureError> {
        for _ in 0..CAPTURE_RETRY_LIMIT {
            let frame = self.latest_frame.lock().await.clone();
            let viewport = *self.viewport.read().await;

            if let Some(frame) = frame {
                let geometry = VideoGeometry::new(frame.width, frame.height, viewport);
                let overlay = OverlaySpec::for_mode(self.mode).layout(&viewport);
                match compute_source_crop(&geometry, &overlay)
                    .and_then(|rect| extract_still(&frame, &rect, overlay.shape))
                {
                    Ok(still) => return Ok(still),
                    // Layout race; wait for the next frame and try again
                    Err(CaptureError::LayoutNotReady) => {}
                    Err(e) => return Err(e),
                }
            }
            tokio::time::sleep(CAPTURE_RETRY_INTERVAL).await;
        }
        Err(CaptureError::LayoutNotReady)
    }

    /// Discard the held still and restart the camera for another attempt.
    pub async fn retake(&self) -> Result<(), CaptureError> {
        {
            let phase = *self.phase.read().await;
            if phase != SessionPhase::Reviewing {
                return Err(CaptureError::InvalidState(format!(
                    "cannot retake in {:?}",
                    phase
                )));
            }
        }
        {
            let mut held = self.still.lock().await;
            if held.take().is_none() {
                warn!("retake with no held still");
            }
        }
        self.teardown_stream().await;
        self.start_stream().await
    }

    /// Accept the held still; the stream is released and the session goes
    /// inert. Ownership of the still passes to the caller.
    pub async fn confirm(&self) -> Result<CapturedStill, CaptureError> {
        {
            let phase = *self.phase.read().await;
            if phase != SessionPhase::Reviewing {
                return Err(CaptureError::InvalidState(format!(
                    "cannot confirm in {:?}",
                    phase
                )));
            }
        }
        let still = {
            let mut held = self.still.lock().await;
            held.take()
                .ok_or_else(|| CaptureError::InvalidState("no still held".to_string()))?
        };
        self.teardown_stream().await;
        self.set_phase(SessionPhase::Confirmed).await;
        Ok(still)
    }

    /// Tear the session down from any state. Cancels pending timers and
    /// releases the stream; safe to call when no stream was ever acquired,
    /// and safe to call twice.
    pub async fn close(&self) {
        self.teardown_stream().await;
        *self.still.lock().await = None;
        self.set_phase(SessionPhase::Closed).await;
    }

    /// Abort owned tasks and release the stream.
    async fn teardown_stream(&self) {
        for slot in [&self.countdown_task, &self.detect_task, &self.pump_task] {
            if let Some(handle) = slot.lock().await.take() {
                handle.abort();
            }
        }
        if let Some(stream) = self.stream.lock().await.take() {
            stream.release();
        }
        self.document_ready.store(false, Ordering::Relaxed);
        *self.countdown_left.lock().await = None;
        *self.latest_frame.lock().await = None;
    }
}
