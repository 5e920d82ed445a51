//! # Acquisition Error Types
//!
//! Error types for scan sessions and the vision fallback.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Acquisition Error Categories                         │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Camera (fatal) │  │ Candidate       │  │  Vision (terminal)      │ │
//! │  │                 │  │ (transient)     │  │                         │ │
//! │  │  NoCameraFound  │  │  InvalidFormat  │  │  AiScanFailed           │ │
//! │  │  PermissionDen. │  │  → notice, 3s   │  │  NoValidCodeFound       │ │
//! │  │  StreamFailed   │  │  session goes on│  │  ServiceUnavailable     │ │
//! │  │  StreamEnded    │  │                 │  │  InvalidImage           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Session        │  │ Transport       │  │  Configuration          │ │
//! │  │                 │  │ (retryable)     │  │                         │ │
//! │  │  Cancelled      │  │  Network        │  │  InvalidConfig          │ │
//! │  │  SessionActive  │  │  Timeout        │  │  ConfigLoadFailed       │ │
//! │  │  SessionClosed  │  │  Upstream 429/5x│  │  ConfigSaveFailed       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decoder "nothing found yet" noise is not an error at all; see
//! [`shelf_core::DecoderSignal`].

use shelf_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for acquisition operations.
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Every way an acquisition attempt can fail.
#[derive(Debug, Error)]
pub enum AcquireError {
    // =========================================================================
    // Camera Errors
    // =========================================================================
    /// The platform enumerated no cameras.
    #[error("No camera found")]
    NoCameraFound,

    /// The platform (or the user) denied camera access.
    #[error("Camera permission denied")]
    PermissionDenied,

    /// The selected camera could not be opened.
    #[error("Failed to open camera stream: {0}")]
    StreamFailed(String),

    /// The platform closed the decode event stream on its own.
    #[error("Camera stream ended unexpectedly")]
    StreamEnded,

    // =========================================================================
    // Candidate Errors
    // =========================================================================
    /// A candidate failed the 10/13 length rule.
    #[error(transparent)]
    InvalidFormat(#[from] ValidationError),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The caller cancelled the session.
    #[error("Scan session cancelled")]
    Cancelled,

    /// A previous session is still live.
    #[error("A scan session is already active ({0})")]
    SessionActive(String),

    /// The session was closed before it was started.
    #[error("Scan session is already closed")]
    SessionClosed,

    // =========================================================================
    // Vision Errors
    // =========================================================================
    /// The image was rejected before being sent.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The vision model returned nothing usable (empty / no text).
    #[error("AI scan failed: {0}")]
    AiScanFailed(String),

    /// The model answered, but no 10/13-character code could be extracted.
    #[error("No valid ISBN found in model response: '{raw}'")]
    NoValidCodeFound { raw: String },

    /// Vision service unreachable, misconfigured, or rejecting us.
    #[error("Vision service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Network failure talking to the vision service.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success HTTP status from the vision service.
    #[error("Vision service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Failed to encode or decode a JSON body.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for AcquireError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoCameraFound => AcquireError::NoCameraFound,
            CoreError::Validation(v) => AcquireError::InvalidFormat(v),
            other @ CoreError::InvalidTransition { .. } => {
                AcquireError::StreamFailed(other.to_string())
            }
        }
    }
}

impl From<reqwest::Error> for AcquireError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            AcquireError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            AcquireError::Serialization(err.to_string())
        } else {
            AcquireError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AcquireError {
    fn from(err: serde_json::Error) -> Self {
        AcquireError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for AcquireError {
    fn from(err: url::ParseError) -> Self {
        AcquireError::InvalidConfig(format!("invalid URL: {}", err))
    }
}

impl From<std::io::Error> for AcquireError {
    fn from(err: std::io::Error) -> Self {
        AcquireError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for AcquireError {
    fn from(err: toml::de::Error) -> Self {
        AcquireError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for AcquireError {
    fn from(err: toml::ser::Error) -> Self {
        AcquireError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl AcquireError {
    /// Returns true if a vision request that failed this way may be retried.
    ///
    /// ## Retryable Errors
    /// - Network failures
    /// - Timeouts
    /// - HTTP 429 and 5xx
    ///
    /// Empty or non-ISBN model answers are never retried: asking the same
    /// question about the same image again does not help.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquireError::Network(_) | AcquireError::Timeout(_) => true,
            AcquireError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error ends the current attempt.
    ///
    /// `InvalidFormat` is the only non-fatal condition: the session absorbs
    /// it and keeps scanning.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AcquireError::InvalidFormat(_))
    }

    /// Returns true if the caller should offer the still-image fallback.
    pub fn suggests_still_image(&self) -> bool {
        matches!(
            self,
            AcquireError::NoCameraFound
                | AcquireError::PermissionDenied
                | AcquireError::StreamFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AcquireError::InvalidConfig(_)
                | AcquireError::ConfigLoadFailed(_)
                | AcquireError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AcquireError::Network("connection reset".into()).is_retryable());
        assert!(AcquireError::Timeout(30).is_retryable());
        assert!(AcquireError::Upstream {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(AcquireError::Upstream {
            status: 429,
            message: "quota".into()
        }
        .is_retryable());

        assert!(!AcquireError::Upstream {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!AcquireError::ServiceUnavailable("no key".into()).is_retryable());
        assert!(!AcquireError::NoValidCodeFound { raw: "hello".into() }.is_retryable());
        assert!(!AcquireError::AiScanFailed("empty".into()).is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        let transient = AcquireError::InvalidFormat(ValidationError::InvalidFormat {
            normalized: "12".into(),
            length: 2,
        });
        assert!(!transient.is_fatal());
        assert!(AcquireError::NoCameraFound.is_fatal());
        assert!(AcquireError::PermissionDenied.is_fatal());
    }

    #[test]
    fn test_still_image_suggestion() {
        assert!(AcquireError::NoCameraFound.suggests_still_image());
        assert!(AcquireError::PermissionDenied.suggests_still_image());
        assert!(!AcquireError::Cancelled.suggests_still_image());
    }

    #[test]
    fn test_core_error_conversion() {
        let err: AcquireError = CoreError::NoCameraFound.into();
        assert!(matches!(err, AcquireError::NoCameraFound));

        let err: AcquireError = CoreError::Validation(ValidationError::InvalidFormat {
            normalized: String::new(),
            length: 0,
        })
        .into();
        assert!(matches!(err, AcquireError::InvalidFormat(_)));
    }

    #[test]
    fn test_error_display() {
        let err = AcquireError::NoValidCodeFound {
            raw: "I can't see a barcode".into(),
        };
        assert!(err.to_string().contains("I can't see a barcode"));
        assert!(AcquireError::is_config_error(&AcquireError::InvalidConfig(
            "x".into()
        )));
    }
}
