//! # Camera Platform Capability
//!
//! The seam between the scan session and whatever actually owns the camera
//! (a browser bridge, a native capture library, a keyboard-wedge scanner).
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Platform Capability                               │
//! │                                                                         │
//! │  list_devices() ──────────────► Vec<CameraDevice>                       │
//! │                                  (may suspend on a permission prompt)   │
//! │                                                                         │
//! │  open_stream(id, config) ─────► OpenedStream                            │
//! │                                  ├── handle: Box<dyn StreamHandle>      │
//! │                                  │     stop()  ─┐ both idempotent       │
//! │                                  │     clear() ─┘                       │
//! │                                  └── events: mpsc::Receiver<DecodeEvent>│
//! │                                        Decoded(text)  (decode callback) │
//! │                                        Error(message) (error callback)  │
//! │                                                                         │
//! │  The producer pushes events until stop() is called or the receiver     │
//! │  is dropped.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use shelf_core::CameraDevice;

use crate::config::CameraSettings;
use crate::error::AcquireResult;

/// Capacity of the decode event channel a platform should create.
pub const DECODE_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// Stream Configuration
// =============================================================================

/// Parameters passed to the platform when opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamConfig {
    /// Decode attempts per second.
    pub fps: u32,
    /// Scan region width in pixels.
    pub scan_box_width: u32,
    /// Scan region height in pixels.
    pub scan_box_height: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig::from(&CameraSettings::default())
    }
}

impl From<&CameraSettings> for StreamConfig {
    fn from(settings: &CameraSettings) -> Self {
        StreamConfig {
            fps: settings.fps,
            scan_box_width: settings.scan_box_width,
            scan_box_height: settings.scan_box_height,
        }
    }
}

// =============================================================================
// Decode Events
// =============================================================================

/// One callback invocation from the platform's decode loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// The decoder read some text off a barcode.
    Decoded(String),
    /// The decoder reported a problem (usually "nothing found yet").
    Error(String),
}

// =============================================================================
// Stream Handle
// =============================================================================

/// Control half of an open camera stream.
///
/// Both operations must be idempotent: calling `stop` on a stopped stream or
/// `clear` on a cleared one returns `Ok(())`.
#[async_trait]
pub trait StreamHandle: Send {
    /// Stops decoding and releases the camera.
    async fn stop(&mut self) -> AcquireResult<()>;

    /// Clears any preview surface / decoder state.
    async fn clear(&mut self) -> AcquireResult<()>;
}

/// A stream that was successfully opened.
pub struct OpenedStream {
    /// Control handle (stop/clear).
    pub handle: Box<dyn StreamHandle>,
    /// Decode and error callbacks, in arrival order.
    pub events: mpsc::Receiver<DecodeEvent>,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream").finish_non_exhaustive()
    }
}

// =============================================================================
// Platform Trait
// =============================================================================

/// Access to the physical cameras.
///
/// Implementations map platform failures onto
/// [`AcquireError::PermissionDenied`](crate::AcquireError::PermissionDenied)
/// and [`AcquireError::StreamFailed`](crate::AcquireError::StreamFailed).
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Enumerates cameras. May suspend for as long as a permission prompt
    /// stays open.
    async fn list_devices(&self) -> AcquireResult<Vec<CameraDevice>>;

    /// Opens a decode stream on one device.
    async fn open_stream(&self, device_id: &str, config: &StreamConfig)
        -> AcquireResult<OpenedStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_from_settings() {
        let settings = CameraSettings {
            fps: 15,
            scan_box_width: 300,
            ..Default::default()
        };
        let config = StreamConfig::from(&settings);
        assert_eq!(config.fps, 15);
        assert_eq!(config.scan_box_width, 300);
        assert_eq!(config.scan_box_height, 150);
    }
}
