//! # Shelf Acquire: ISBN Acquisition Engine
//!
//! Turns a camera or a still photo into a validated [`ScanResult`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         shelf-acquire                                   │
//! │                                                                         │
//! │   ┌──────────────┐      ┌──────────────┐      ┌──────────────────────┐ │
//! │   │ CameraPlatform│────►│ ScanSession  │─────►│ ScanEventSink        │ │
//! │   │ (trait)       │     │ state machine│      │ (UI / CLI output)    │ │
//! │   └──────────────┘      └──────┬───────┘      └──────────────────────┘ │
//! │                                │ ScanResult { source: Camera }          │
//! │                                ▼                                        │
//! │                         ┌──────────────┐                                │
//! │                         │ IsbnAcquirer │──► catalog lookup (caller)     │
//! │                         └──────▲───────┘                                │
//! │                                │ ScanResult { source: Vision }          │
//! │   ┌──────────────┐      ┌──────┴───────┐                                │
//! │   │ VisionModel   │◄────│VisionFallback│                                │
//! │   │ (Gemini HTTP) │     │ retry/backoff│                                │
//! │   └──────────────┘      └──────────────┘                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`session`]: one scan attempt, its states and cancellation
//! - [`guard`]: scoped release of the camera stream
//! - [`platform`]: the camera capability traits
//! - [`vision`] and [`gemini`]: still-image recognition
//! - [`acquirer`]: the single entry point tying them together
//! - [`config`]: TOML + environment configuration

pub mod acquirer;
pub mod config;
pub mod error;
pub mod gemini;
pub mod guard;
pub mod platform;
pub mod session;
pub mod vision;

#[cfg(test)]
mod testing;

pub use acquirer::{AcquireRequest, IsbnAcquirer};
pub use config::{AcquireConfig, CameraSettings, VisionSettings};
pub use error::{AcquireError, AcquireResult};
pub use gemini::GeminiVisionClient;
pub use guard::StreamGuard;
pub use platform::{
    CameraPlatform, DecodeEvent, OpenedStream, StreamConfig, StreamHandle, DECODE_CHANNEL_CAPACITY,
};
pub use session::{NoOpSink, ScanEventSink, ScanSession, ScanSessionHandle, SessionSettings};
pub use vision::{
    extract_scan_result, sniff_mime_type, InlineImage, RetryPolicy, VisionFallback, VisionModel,
    VisionRequest, ISBN_INSTRUCTION,
};

pub use shelf_core::{CameraDevice, ScanNotice, ScanResult, ScanSessionState, ScanSource};
