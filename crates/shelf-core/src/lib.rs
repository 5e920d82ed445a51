//! # shelf-core: Pure ISBN Acquisition Logic
//!
//! The decisions of the scanning pipeline, with zero I/O dependencies.
//! Both acquisition channels (live camera, vision fallback) hand their raw
//! text to this crate and get back either a [`ScanResult`] or a typed
//! rejection.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shelf Scanner Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌──────────────────────────┐      │
//! │  │   Camera decode events   │        │   Vision model response  │      │
//! │  │   "978-0-13-468599-1"    │        │   "ISBN: 0-13-468599-1"  │      │
//! │  └────────────┬─────────────┘        └────────────┬─────────────┘      │
//! │               │                                   │                     │
//! │  ┌────────────▼───────────────────────────────────▼─────────────────┐  │
//! │  │               ★ shelf-core (THIS CRATE) ★                        │  │
//! │  │                                                                  │  │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │  │
//! │  │   │   isbn    │  │  camera   │  │  decoder  │  │   types   │   │  │
//! │  │   │ normalize │  │  select   │  │  noise vs │  │ ScanResult│   │  │
//! │  │   │ validate  │  │  device   │  │  warning  │  │ states    │   │  │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │  │
//! │  │                                                                  │  │
//! │  │   NO I/O • NO CAMERA • NO NETWORK • PURE FUNCTIONS              │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │               ScanResult { code: "9780134685991", source }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`isbn`] - Normalizer/Validator and check-digit helpers
//! - [`camera`] - Camera device selection heuristics
//! - [`decoder`] - Classification of decoder error-callback messages
//! - [`types`] - Domain types (ScanResult, CameraDevice, ScanSessionState)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shelf_core::isbn::{normalize, validate, IsbnKind};
//!
//! let code = normalize("978-0-13-468599-1");
//! assert_eq!(code, "9780134685991");
//! assert_eq!(validate(&code).unwrap(), IsbnKind::Isbn13);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod camera;
pub mod decoder;
pub mod error;
pub mod isbn;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use camera::{choose_device, select_device, select_device_with};
pub use decoder::{classify_decoder_message, DecoderSignal};
pub use error::{CoreError, CoreResult, ValidationError};
pub use isbn::{normalize, validate, CandidateCode, IsbnKind};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Length of a legacy ISBN-10.
pub const ISBN10_LEN: usize = 10;

/// Length of an ISBN-13 (EAN-13 with a 978/979 prefix).
pub const ISBN13_LEN: usize = 13;

/// Label fragments that identify a rear-facing camera.
///
/// Platform labels are free text ("Back Camera", "camera2 0, facing back",
/// "Rear Wide", "environment"); a rear camera is what a shopper points at a
/// book cover.
pub const DEFAULT_LABEL_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// Seconds an `InvalidFormat` notice stays visible before clearing itself.
pub const NOTICE_CLEAR_SECS: u64 = 3;
