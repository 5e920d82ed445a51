//! # Scan Session
//!
//! Owns one camera stream for one scan attempt and turns its decode events
//! into at most one [`ScanResult`].
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Session Loop                                │
//! │                                                                         │
//! │  run()                                                                  │
//! │   │                                                                     │
//! │   ├─ Idle → Requesting                                                  │
//! │   │    list_devices()      ◄── may sit on a permission prompt           │
//! │   │    choose_device()     ◄── explicit id, else rear-label heuristic   │
//! │   │    open_stream()                                                    │
//! │   │                                                                     │
//! │   ├─ Requesting → Scanning                                              │
//! │   │    loop select! {                                                   │
//! │   │      cancel            → Err(Cancelled)                             │
//! │   │      notice expired    → on_notice_cleared()                        │
//! │   │      Decoded(text)     → valid?   on_detected() → Ok(result)        │
//! │   │                          invalid? on_notice(), keep scanning        │
//! │   │      Error(message)    → noise?   drop silently                     │
//! │   │                          else     on_warning(), keep scanning       │
//! │   │      channel closed    → Err(StreamEnded)                           │
//! │   │    }                                                                │
//! │   │                                                                     │
//! │   └─ (Error →) Closed      guard.release(): stop() + clear()            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation
//! [`ScanSessionHandle::cancel`] works in every state, including while the
//! platform is suspended on a permission prompt. There is no internal
//! timeout: only the caller decides when to give up.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use shelf_core::{
    choose_device, classify_decoder_message, CandidateCode, DecoderSignal, ScanNotice, ScanResult,
    ScanSessionState, ScanSource,
};

use crate::config::CameraSettings;
use crate::error::{AcquireError, AcquireResult};
use crate::guard::StreamGuard;
use crate::platform::{CameraPlatform, DecodeEvent, OpenedStream, StreamConfig};

// =============================================================================
// Event Sink Trait
// =============================================================================

/// Receives everything a session wants the user interface to know.
///
/// Callbacks run inline on the session task; implementations must not block.
pub trait ScanEventSink: Send + Sync {
    /// The session moved to a new state.
    fn on_state(&self, session_id: Uuid, state: ScanSessionState);

    /// A valid code was read. Fires at most once per session.
    fn on_detected(&self, session_id: Uuid, result: &ScanResult);

    /// A candidate was rejected; show `notice` until it is cleared.
    fn on_notice(&self, session_id: Uuid, notice: &ScanNotice);

    /// The current notice expired.
    fn on_notice_cleared(&self, session_id: Uuid);

    /// The decoder reported something other than "nothing found yet".
    fn on_warning(&self, session_id: Uuid, message: &str);

    /// The session is ending because of `error`.
    fn on_error(&self, session_id: Uuid, error: &AcquireError);
}

/// Sink that ignores every event.
pub struct NoOpSink;

impl ScanEventSink for NoOpSink {
    fn on_state(&self, _session_id: Uuid, _state: ScanSessionState) {}
    fn on_detected(&self, _session_id: Uuid, _result: &ScanResult) {}
    fn on_notice(&self, _session_id: Uuid, _notice: &ScanNotice) {}
    fn on_notice_cleared(&self, _session_id: Uuid) {}
    fn on_warning(&self, _session_id: Uuid, _message: &str) {}
    fn on_error(&self, _session_id: Uuid, _error: &AcquireError) {}
}

// =============================================================================
// Session Settings
// =============================================================================

/// Per-session knobs, derived from [`CameraSettings`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Explicit camera choice, if any.
    pub device_id: Option<String>,
    /// Rear-camera label hints.
    pub label_hints: Vec<String>,
    /// Stream parameters passed to the platform.
    pub stream: StreamConfig,
    /// Lifetime of an invalid-format notice.
    pub notice_clear_after: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings::from(&CameraSettings::default())
    }
}

impl From<&CameraSettings> for SessionSettings {
    fn from(settings: &CameraSettings) -> Self {
        SessionSettings {
            device_id: settings.device_id.clone(),
            label_hints: settings.label_hints.clone(),
            stream: StreamConfig::from(settings),
            notice_clear_after: settings.notice_clear_after(),
        }
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// Handle for observing and cancelling a session from other tasks.
#[derive(Clone)]
pub struct ScanSessionHandle {
    id: Uuid,
    state: Arc<watch::Sender<ScanSessionState>>,
    cancel: CancellationToken,
    sink: Arc<dyn ScanEventSink>,
}

impl ScanSessionHandle {
    /// Session id (also the `session_id` field of its tracing span).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> ScanSessionState {
        *self.state.borrow()
    }

    /// Returns true once the session is closed.
    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ScanSessionState> {
        self.state.subscribe()
    }

    /// Requests the session to close. Never fails, safe to call repeatedly.
    ///
    /// A session that was never started goes straight to `Closed`; a running
    /// one releases its camera and closes from its own task.
    pub fn cancel(&self) {
        let closed_before_start = self.state.send_if_modified(|state| {
            if *state == ScanSessionState::Idle {
                *state = ScanSessionState::Closed;
                true
            } else {
                false
            }
        });

        if closed_before_start {
            debug!(session_id = %self.id, "Session closed before start");
            self.sink.on_state(self.id, ScanSessionState::Closed);
        }

        self.cancel.cancel();
    }

    /// Waits until the session reaches `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as this handle, so this cannot fail
        let _ = rx.wait_for(|state| state.is_terminal()).await;
    }
}

impl std::fmt::Debug for ScanSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSessionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Scan Session
// =============================================================================

/// A single scan attempt against the camera platform.
///
/// ## Usage
/// ```rust,ignore
/// let session = ScanSession::new(platform, SessionSettings::default(), sink);
/// let handle = session.handle();
///
/// // Somewhere else: the user pressed "Cancel"
/// handle.cancel();
///
/// match session.run().await {
///     Ok(result) => lookup(result.code()).await,
///     Err(AcquireError::Cancelled) => {}
///     Err(e) if e.suggests_still_image() => offer_photo_upload(),
///     Err(e) => show_error(e),
/// }
/// ```
pub struct ScanSession {
    id: Uuid,
    platform: Arc<dyn CameraPlatform>,
    settings: SessionSettings,
    sink: Arc<dyn ScanEventSink>,
    state: Arc<watch::Sender<ScanSessionState>>,
    cancel: CancellationToken,
}

impl ScanSession {
    /// Creates an idle session.
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        settings: SessionSettings,
        sink: Arc<dyn ScanEventSink>,
    ) -> Self {
        let (state, _) = watch::channel(ScanSessionState::Idle);

        ScanSession {
            id: Uuid::new_v4(),
            platform,
            settings,
            sink,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
        }
    }

    /// Session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> ScanSessionState {
        *self.state.borrow()
    }

    /// Returns a handle for observing / cancelling this session.
    pub fn handle(&self) -> ScanSessionHandle {
        ScanSessionHandle {
            id: self.id,
            state: self.state.clone(),
            cancel: self.cancel.clone(),
            sink: self.sink.clone(),
        }
    }

    /// Runs the session on its own Tokio task.
    pub fn spawn(self) -> (ScanSessionHandle, JoinHandle<AcquireResult<ScanResult>>) {
        let handle = self.handle();
        let task = tokio::spawn(self.run());
        (handle, task)
    }

    /// Runs the session to completion.
    ///
    /// Consumes the session: a session is started at most once, so it can
    /// never hold two streams.
    pub async fn run(self) -> AcquireResult<ScanResult> {
        let span = info_span!("scan_session", session_id = %self.id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> AcquireResult<ScanResult> {
        if self.transition(ScanSessionState::Requesting).is_err() {
            debug!(state = %self.state(), "Session not startable");
            return Err(AcquireError::SessionClosed);
        }

        info!("Scan session starting");

        let mut guard = StreamGuard::new();
        let outcome = self.drive(&mut guard).await;

        match &outcome {
            Ok(result) => {
                info!(code = %result.code(), "Scan session succeeded");
            }
            Err(AcquireError::Cancelled) => {
                info!("Scan session cancelled");
            }
            Err(e) => {
                warn!(error = %e, "Scan session failed");
                if let Err(te) = self.transition(ScanSessionState::Error) {
                    debug!(error = %te, "Could not enter error state");
                }
                self.sink.on_error(self.id, e);
            }
        }

        guard.release().await;

        if let Err(e) = self.transition(ScanSessionState::Closed) {
            warn!(error = %e, "Could not close session");
        }

        outcome
    }

    /// Enumerate → select → open → decode loop.
    async fn drive(&self, guard: &mut StreamGuard) -> AcquireResult<ScanResult> {
        let devices = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AcquireError::Cancelled),
            devices = self.platform.list_devices() => devices?,
        };
        debug!(count = devices.len(), "Cameras enumerated");

        let device = choose_device(
            &devices,
            self.settings.device_id.as_deref(),
            &self.settings.label_hints,
        )?
        .clone();

        if let Some(preferred) = &self.settings.device_id {
            if preferred != &device.id {
                warn!(preferred = %preferred, "Preferred camera not present, using label heuristic");
            }
        }
        info!(device_id = %device.id, label = %device.label, "Camera selected");

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AcquireError::Cancelled),
            opened = self.platform.open_stream(&device.id, &self.settings.stream) => opened?,
        };

        let OpenedStream { handle, mut events } = opened;
        guard.attach(device.id.clone(), handle).await?;
        self.transition(ScanSessionState::Scanning)?;

        let mut notice_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    return Err(AcquireError::Cancelled);
                }

                _ = notice_expiry(notice_deadline) => {
                    notice_deadline = None;
                    debug!("Notice cleared");
                    self.sink.on_notice_cleared(self.id);
                }

                event = events.recv() => match event {
                    Some(DecodeEvent::Decoded(text)) => match self.evaluate(&text) {
                        Ok(result) => {
                            self.sink.on_detected(self.id, &result);
                            return Ok(result);
                        }
                        Err(notice) => {
                            notice_deadline = Some(Instant::now() + self.settings.notice_clear_after);
                            self.sink.on_notice(self.id, &notice);
                        }
                    },
                    Some(DecodeEvent::Error(message)) => match classify_decoder_message(&message) {
                        DecoderSignal::Noise => trace!("Decoder noise"),
                        DecoderSignal::Warning(warning) => {
                            warn!(message = %warning, "Decoder warning");
                            self.sink.on_warning(self.id, &warning);
                        }
                    },
                    None => return Err(AcquireError::StreamEnded),
                },
            }
        }
    }

    /// Runs one decoded text through the normalizer/validator.
    fn evaluate(&self, raw: &str) -> Result<ScanResult, ScanNotice> {
        let candidate = CandidateCode::from_raw(raw);

        match ScanResult::from_candidate(&candidate, ScanSource::Camera) {
            Ok(result) => {
                if !candidate.checksum_matches() {
                    warn!(code = %result.code(), "ISBN check digit mismatch");
                }
                Ok(result)
            }
            Err(err) => {
                debug!(raw = %raw, normalized = %candidate.normalized, "Candidate rejected");
                Err(ScanNotice::invalid_format(
                    &err,
                    Utc::now(),
                    self.settings.notice_clear_after,
                ))
            }
        }
    }

    /// Applies a state change, notifying watchers and the sink.
    fn transition(&self, next: ScanSessionState) -> AcquireResult<()> {
        let mut outcome = Ok(false);

        self.state.send_if_modified(|current| match current.transition(next) {
            Ok(state) => {
                let changed = *current != state;
                *current = state;
                outcome = Ok(changed);
                changed
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });

        if outcome? {
            debug!(state = %next, "Session state changed");
            self.sink.on_state(self.id, next);
        }
        Ok(())
    }
}

impl Drop for ScanSession {
    /// Marks the session closed if it ends without reaching `Closed`, e.g.
    /// when the `run()` future is dropped mid-scan. The stream itself is
    /// released by the [`StreamGuard`] living in that future.
    fn drop(&mut self) {
        let closed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ScanSessionState::Closed;
                true
            }
        });

        if closed {
            self.cancel.cancel();
            debug!(session_id = %self.id, "Session dropped before finishing, marked closed");
            self.sink.on_state(self.id, ScanSessionState::Closed);
        }
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Resolves when the notice deadline passes; never resolves without one.
async fn notice_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
