//! # Domain Types
//!
//! Core domain types shared by both acquisition channels.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CameraDevice   │   │ScanSessionState │   │   ScanResult    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (opaque)    │   │  Idle           │   │  code (10/13)   │       │
//! │  │  label (free)   │   │  Requesting     │   │  source         │       │
//! │  └─────────────────┘   │  Scanning       │   └─────────────────┘       │
//! │                        │  Error          │                              │
//! │  ┌─────────────────┐   │  Closed         │   ┌─────────────────┐       │
//! │  │   ScanNotice    │   └─────────────────┘   │   ScanSource    │       │
//! │  │  transient UI   │                         │  Camera         │       │
//! │  │  message, 3s    │                         │  Vision         │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::isbn::CandidateCode;

// =============================================================================
// Camera Device
// =============================================================================

/// A camera as enumerated by the platform.
///
/// The label is free text supplied by the OS/browser. It is only ever used
/// for heuristic selection, never parsed structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CameraDevice {
    /// Opaque platform identifier, passed back verbatim when opening a stream.
    pub id: String,

    /// Human-readable label ("Back Camera", "FaceTime HD Camera", ...).
    pub label: String,
}

impl CameraDevice {
    /// Creates a device from an id and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        CameraDevice {
            id: id.into(),
            label: label.into(),
        }
    }
}

// =============================================================================
// Scan Session State
// =============================================================================

/// Lifecycle state of a scan session.
///
/// ## State Machine
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  ┌──────┐  start   ┌────────────┐  stream open  ┌──────────┐           │
/// │  │ Idle │ ───────► │ Requesting │ ────────────► │ Scanning │ ◄──┐      │
/// │  └──┬───┘          └─────┬──────┘               └────┬─────┘    │      │
/// │     │                    │ no camera /               │  invalid │      │
/// │     │ cancel             │ permission denied         │  code    │      │
/// │     │                    ▼                           ├──────────┘      │
/// │     │              ┌──────────┐                      │                 │
/// │     │              │  Error   │ ◄────── fatal ───────┤                 │
/// │     │              └────┬─────┘                      │ valid code /    │
/// │     │                   │                            │ cancel          │
/// │     │                   ▼                            ▼                 │
/// │     │              ┌──────────────────────────────────────┐            │
/// │     └────────────► │ Closed (terminal, camera released)   │            │
/// │                    └──────────────────────────────────────┘            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ScanSessionState {
    /// Created, not started.
    #[default]
    Idle,
    /// Enumerating cameras / waiting on the permission prompt.
    Requesting,
    /// Stream open, decode events flowing.
    Scanning,
    /// A fatal error occurred; release is in progress.
    Error,
    /// Terminal. The camera is not held.
    Closed,
}

impl ScanSessionState {
    /// Returns true if the state machine allows moving to `next`.
    pub fn can_transition_to(self, next: ScanSessionState) -> bool {
        use ScanSessionState::*;

        matches!(
            (self, next),
            (Idle, Requesting)
                | (Idle, Closed)
                | (Requesting, Scanning)
                | (Requesting, Error)
                | (Requesting, Closed)
                | (Scanning, Scanning)
                | (Scanning, Error)
                | (Scanning, Closed)
                | (Error, Closed)
        )
    }

    /// Checks a transition, returning the new state.
    pub fn transition(self, next: ScanSessionState) -> CoreResult<ScanSessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns true once the session can no longer change.
    pub fn is_terminal(self) -> bool {
        self == ScanSessionState::Closed
    }

    /// Returns true while the session may be holding (or acquiring) the camera.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ScanSessionState::Requesting | ScanSessionState::Scanning | ScanSessionState::Error
        )
    }
}

impl std::fmt::Display for ScanSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSessionState::Idle => write!(f, "idle"),
            ScanSessionState::Requesting => write!(f, "requesting"),
            ScanSessionState::Scanning => write!(f, "scanning"),
            ScanSessionState::Error => write!(f, "error"),
            ScanSessionState::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Scan Result
// =============================================================================

/// Which acquisition channel produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ScanSource {
    /// Live barcode decode.
    Camera,
    /// Still image sent to the vision model.
    Vision,
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::Camera => write!(f, "camera"),
            ScanSource::Vision => write!(f, "vision"),
        }
    }
}

/// The only artifact that leaves the acquisition pipeline.
///
/// ## Invariant
/// `code` is always a normalized string of length 10 or 13. The fields are
/// private and the only constructor goes through validation, so an invalid
/// code cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ScanResult {
    code: String,
    source: ScanSource,
}

impl ScanResult {
    /// Builds a result from a candidate, rejecting invalid lengths.
    ///
    /// ## Example
    /// ```rust
    /// use shelf_core::{CandidateCode, ScanResult, ScanSource};
    ///
    /// let candidate = CandidateCode::from_raw("978-0-13-468599-1");
    /// let result = ScanResult::from_candidate(&candidate, ScanSource::Camera).unwrap();
    /// assert_eq!(result.code(), "9780134685991");
    /// ```
    pub fn from_candidate(
        candidate: &CandidateCode,
        source: ScanSource,
    ) -> Result<Self, ValidationError> {
        candidate.validate()?;

        Ok(ScanResult {
            code: candidate.normalized.clone(),
            source,
        })
    }

    /// The canonical ISBN (10 or 13 characters).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The channel that produced it.
    pub fn source(&self) -> ScanSource {
        self.source
    }
}

// =============================================================================
// Scan Notice
// =============================================================================

/// A transient, user-visible message about a rejected candidate.
///
/// Raised for `InvalidFormat`; the session keeps scanning and the notice
/// clears itself at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanNotice {
    /// Text to display.
    pub message: String,

    /// When the notice was raised.
    pub raised_at: DateTime<Utc>,

    /// When the notice should disappear.
    pub expires_at: DateTime<Utc>,
}

impl ScanNotice {
    /// Creates a notice for a rejected candidate.
    pub fn invalid_format(
        error: &ValidationError,
        now: DateTime<Utc>,
        clear_after: std::time::Duration,
    ) -> Self {
        let lifetime = chrono::Duration::from_std(clear_after)
            .unwrap_or_else(|_| chrono::Duration::zero());

        ScanNotice {
            message: error.to_string(),
            raised_at: now,
            expires_at: now + lifetime,
        }
    }

    /// Returns true once `now` has reached the expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_happy_path_transitions() {
        let state = ScanSessionState::Idle;
        let state = state.transition(ScanSessionState::Requesting).unwrap();
        let state = state.transition(ScanSessionState::Scanning).unwrap();
        let state = state.transition(ScanSessionState::Scanning).unwrap();
        let state = state.transition(ScanSessionState::Closed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_closed_is_terminal() {
        for next in [
            ScanSessionState::Idle,
            ScanSessionState::Requesting,
            ScanSessionState::Scanning,
            ScanSessionState::Error,
            ScanSessionState::Closed,
        ] {
            assert!(!ScanSessionState::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_error_only_closes() {
        assert!(ScanSessionState::Error.can_transition_to(ScanSessionState::Closed));
        assert!(!ScanSessionState::Error.can_transition_to(ScanSessionState::Scanning));
        assert!(!ScanSessionState::Error.can_transition_to(ScanSessionState::Requesting));
    }

    #[test]
    fn test_cannot_skip_requesting() {
        let err = ScanSessionState::Idle
            .transition(ScanSessionState::Scanning)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_is_live() {
        assert!(!ScanSessionState::Idle.is_live());
        assert!(ScanSessionState::Requesting.is_live());
        assert!(ScanSessionState::Scanning.is_live());
        assert!(!ScanSessionState::Closed.is_live());
    }

    #[test]
    fn test_scan_result_requires_valid_candidate() {
        let good = CandidateCode::from_raw("978-0-13-468599-1");
        let result = ScanResult::from_candidate(&good, ScanSource::Camera).unwrap();
        assert_eq!(result.code(), "9780134685991");
        assert_eq!(result.source(), ScanSource::Camera);

        let bad = CandidateCode::from_raw("12");
        assert!(ScanResult::from_candidate(&bad, ScanSource::Camera).is_err());
    }

    #[test]
    fn test_scan_result_serialization() {
        let candidate = CandidateCode::from_raw("0-13-468599-1");
        let result = ScanResult::from_candidate(&candidate, ScanSource::Vision).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"code":"0134685991","source":"vision"}"#);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ScanSessionState::Requesting).unwrap();
        assert_eq!(json, r#""requesting""#);
    }

    #[test]
    fn test_notice_expiry() {
        let err = ValidationError::InvalidFormat {
            normalized: "12".into(),
            length: 2,
        };
        let now = Utc::now();
        let notice = ScanNotice::invalid_format(&err, now, Duration::from_secs(3));

        assert!(notice.message.contains("'12'"));
        assert!(!notice.is_expired(now));
        assert!(!notice.is_expired(now + chrono::Duration::milliseconds(2999)));
        assert!(notice.is_expired(now + chrono::Duration::seconds(3)));
    }
}
