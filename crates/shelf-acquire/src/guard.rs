//! # Stream Guard
//!
//! Scoped ownership of the one camera stream a session may hold.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  session start ──► StreamGuard::new()          (empty)                  │
//! │  stream opened ──► guard.attach(handle)        (holds the camera)       │
//! │                                                                         │
//! │  ANY exit path:                                                         │
//! │    success / cancel / fatal error ──► guard.release().await             │
//! │    session future dropped         ──► Drop spawns the same release      │
//! │                                                                         │
//! │  release = stop() then clear(); errors are logged, never raised;        │
//! │  a second release is a no-op.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, warn};

use crate::error::{AcquireError, AcquireResult};
use crate::platform::StreamHandle;

/// Owns at most one open stream and guarantees its release.
#[derive(Default)]
pub struct StreamGuard {
    handle: Option<Box<dyn StreamHandle>>,
    device_id: Option<String>,
}

impl StreamGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a freshly opened stream.
    ///
    /// Fails if the guard already holds one; the rejected handle is stopped
    /// before returning.
    pub async fn attach(
        &mut self,
        device_id: impl Into<String>,
        handle: Box<dyn StreamHandle>,
    ) -> AcquireResult<()> {
        let device_id = device_id.into();

        if let Some(current) = &self.device_id {
            warn!(current = %current, rejected = %device_id, "Refusing second camera stream");
            release_handle(handle, &device_id).await;
            return Err(AcquireError::StreamFailed(format!(
                "stream already open on device {}",
                current
            )));
        }

        debug!(device_id = %device_id, "Camera stream attached");
        self.handle = Some(handle);
        self.device_id = Some(device_id);
        Ok(())
    }

    /// Returns true while a stream is held.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops and clears the stream, if any. Idempotent.
    pub async fn release(&mut self) {
        let device_id = self.device_id.take().unwrap_or_default();

        match self.handle.take() {
            Some(handle) => release_handle(handle, &device_id).await,
            None => debug!("No camera stream to release"),
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let device_id = self.device_id.take().unwrap_or_default();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(device_id = %device_id, "Releasing camera stream from drop");
                runtime.spawn(async move {
                    release_handle(handle, &device_id).await;
                });
            }
            Err(_) => {
                warn!(device_id = %device_id, "No runtime available, camera stream not released");
            }
        }
    }
}

/// Runs stop-then-clear, logging failures. Clear runs even if stop failed.
async fn release_handle(mut handle: Box<dyn StreamHandle>, device_id: &str) {
    if let Err(e) = handle.stop().await {
        warn!(device_id = %device_id, error = %e, "Failed to stop camera stream");
    }
    if let Err(e) = handle.clear().await {
        warn!(device_id = %device_id, error = %e, "Failed to clear camera stream");
    }
    debug!(device_id = %device_id, "Camera stream released");
}
