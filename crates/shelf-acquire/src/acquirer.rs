//! # ISBN Acquirer
//!
//! Front door for the rest of the application: one object that knows about
//! the camera platform, the vision fallback, and the single live session.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  acquire(Camera)              ──► ScanSession::run()                    │
//! │  acquire(StillImage(bytes))   ──► VisionFallback::recognize()           │
//! │  acquire(CameraOrImage(bytes))──► camera; if the camera is unusable     │
//! │                                   (no device / denied / won't open)     │
//! │                                   fall back to the still image          │
//! │                                                                         │
//! │  begin_session() refuses while the previous session is not Closed,      │
//! │  so at most one camera stream exists per acquirer.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use shelf_core::ScanResult;

use crate::config::{AcquireConfig, CameraSettings};
use crate::error::{AcquireError, AcquireResult};
use crate::platform::CameraPlatform;
use crate::session::{NoOpSink, ScanEventSink, ScanSession, ScanSessionHandle, SessionSettings};
use crate::vision::VisionFallback;

/// What the caller wants to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireRequest {
    /// Live camera session.
    Camera,
    /// A still photo, straight to the vision fallback.
    StillImage(Vec<u8>),
    /// Live camera first; the photo is used only if no camera is usable.
    CameraOrImage(Vec<u8>),
}

/// Owns the producers of ISBN codes.
pub struct IsbnAcquirer {
    platform: Option<Arc<dyn CameraPlatform>>,
    vision: Option<VisionFallback>,
    camera: CameraSettings,
    sink: Arc<dyn ScanEventSink>,
    active: Option<ScanSessionHandle>,
}

impl IsbnAcquirer {
    /// Creates an acquirer with no producers attached.
    pub fn new(camera: CameraSettings) -> Self {
        IsbnAcquirer {
            platform: None,
            vision: None,
            camera,
            sink: Arc::new(NoOpSink),
            active: None,
        }
    }

    /// Creates an acquirer from configuration.
    ///
    /// The vision fallback is attached only when an API key is configured.
    pub fn from_config(config: &AcquireConfig, platform: Option<Arc<dyn CameraPlatform>>) -> Self {
        let mut acquirer = IsbnAcquirer::new(config.camera.clone());
        acquirer.platform = platform;

        if config.vision.is_configured() {
            match VisionFallback::from_settings(&config.vision) {
                Ok(vision) => acquirer.vision = Some(vision),
                Err(e) => warn!(error = %e, "Vision fallback disabled"),
            }
        } else {
            info!("No vision API key configured, still-image recognition disabled");
        }

        acquirer
    }

    /// Attaches a camera platform.
    pub fn with_platform(mut self, platform: Arc<dyn CameraPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Attaches a vision fallback.
    pub fn with_vision(mut self, vision: VisionFallback) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Routes session events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ScanEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns true if a still image can be recognized.
    pub fn has_vision(&self) -> bool {
        self.vision.is_some()
    }

    /// Handle to the most recent session, if any.
    pub fn active_session(&self) -> Option<&ScanSessionHandle> {
        self.active.as_ref()
    }

    /// Cancels the most recent session. No-op if there is none.
    pub fn cancel_active(&self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
    }

    /// Creates a new idle session.
    ///
    /// Fails with `SessionActive` while the previous session has not closed
    /// and with `NoCameraFound` if no platform is attached.
    pub fn begin_session(&mut self) -> AcquireResult<ScanSession> {
        if let Some(handle) = &self.active {
            if !handle.is_closed() {
                return Err(AcquireError::SessionActive(handle.id().to_string()));
            }
        }

        let platform = self.platform.clone().ok_or(AcquireError::NoCameraFound)?;
        let session = ScanSession::new(
            platform,
            SessionSettings::from(&self.camera),
            self.sink.clone(),
        );
        self.active = Some(session.handle());
        Ok(session)
    }

    /// Recognizes an ISBN from a still image.
    pub async fn recognize_image(&self, image: &[u8]) -> AcquireResult<ScanResult> {
        let vision = self.vision.as_ref().ok_or_else(|| {
            AcquireError::ServiceUnavailable("vision fallback is not configured".into())
        })?;
        vision.recognize(image).await
    }

    /// Runs one acquisition to completion.
    pub async fn acquire(&mut self, request: AcquireRequest) -> AcquireResult<ScanResult> {
        match request {
            AcquireRequest::Camera => self.begin_session()?.run().await,
            AcquireRequest::StillImage(image) => self.recognize_image(&image).await,
            AcquireRequest::CameraOrImage(image) => {
                let camera = match self.begin_session() {
                    Ok(session) => session.run().await,
                    Err(e) => Err(e),
                };

                match camera {
                    Err(e) if e.suggests_still_image() && self.has_vision() => {
                        info!(error = %e, "Camera unusable, recognizing still image");
                        self.recognize_image(&image).await
                    }
                    other => other,
                }
            }
        }
    }
}
