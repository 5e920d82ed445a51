//! # Error Types
//!
//! Domain-specific error types for shelf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelf-core errors (this file)                                         │
//! │  ├── CoreError        - Selection / state-rule failures                │
//! │  └── ValidationError  - Candidate code rejected                        │
//! │                                                                         │
//! │  shelf-acquire errors (separate crate)                                 │
//! │  └── AcquireError     - Camera, permission, vision, config failures    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AcquireError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::ScanSessionState;

// =============================================================================
// Core Error
// =============================================================================

/// Core acquisition errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The platform enumerated no cameras at all.
    ///
    /// ## When This Occurs
    /// - Desktop without a webcam
    /// - Every camera is held by another application and hidden
    /// - The platform reports an empty list before permission is granted
    #[error("No camera found")]
    NoCameraFound,

    /// A session state change that the state machine does not allow.
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: ScanSessionState,
        to: ScanSessionState,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Candidate code rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The normalized candidate is neither 10 nor 13 characters long.
    ///
    /// ## User Workflow
    /// ```text
    /// Decoder reads "12" off a price sticker
    ///      │
    ///      ▼
    /// normalize("12") = "12" (length 2)
    ///      │
    ///      ▼
    /// InvalidFormat { normalized: "12", length: 2 }
    ///      │
    ///      ▼
    /// UI shows the notice for 3 seconds, scanning continues
    /// ```
    #[error("Invalid ISBN format: '{normalized}' has {length} characters, expected 10 or 13")]
    InvalidFormat { normalized: String, length: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
