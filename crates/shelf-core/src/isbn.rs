//! # ISBN Normalizer/Validator
//!
//! Turns whatever text a decoder or a vision model produced into a canonical
//! ISBN candidate, and decides whether it may leave the pipeline.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Normalize → Validate                               │
//! │                                                                         │
//! │  raw:        "ISBN: 0-13-468599-1 (paperback)"                          │
//! │                   │                                                     │
//! │                   ▼  normalize(): keep 0-9 and x/X, uppercase          │
//! │  normalized: "0134685991"                                               │
//! │                   │                                                     │
//! │                   ▼  validate(): length must be exactly 10 or 13       │
//! │  kind:       IsbnKind::Isbn10                                           │
//! │                                                                         │
//! │  Anything else → ValidationError::InvalidFormat                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validity is a length rule only. The check digit is available through
//! [`checksum_matches`] for diagnostics, but a code with a wrong check digit
//! is still accepted: catalog lookup is the authority on whether a book
//! exists.

use serde::Serialize;

use crate::error::ValidationError;
use crate::{ISBN10_LEN, ISBN13_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Normalizer
// =============================================================================

/// Strips everything except ASCII digits and the letter `X`, uppercased.
///
/// Pure, total and idempotent: `normalize(&normalize(x)) == normalize(x)`.
///
/// ## Example
/// ```rust
/// use shelf_core::isbn::normalize;
///
/// assert_eq!(normalize("978-0-13-468599-1"), "9780134685991");
/// assert_eq!(normalize("0-8044-2957-x"), "080442957X");
/// assert_eq!(normalize("no digits here"), "");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// =============================================================================
// Validator
// =============================================================================

/// The two ISBN shapes the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsbnKind {
    /// Legacy 10-character form (last character may be `X`).
    Isbn10,
    /// 13-digit EAN form, prefix 978 or 979.
    Isbn13,
}

impl std::fmt::Display for IsbnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsbnKind::Isbn10 => write!(f, "ISBN-10"),
            IsbnKind::Isbn13 => write!(f, "ISBN-13"),
        }
    }
}

/// Validates an already-normalized candidate.
///
/// ## Rules
/// - Length exactly 10 → [`IsbnKind::Isbn10`]
/// - Length exactly 13 → [`IsbnKind::Isbn13`]
/// - Anything else → [`ValidationError::InvalidFormat`]
///
/// ## Example
/// ```rust
/// use shelf_core::isbn::{validate, IsbnKind};
///
/// assert_eq!(validate("9780134685991").unwrap(), IsbnKind::Isbn13);
/// assert!(validate("12").is_err());
/// ```
pub fn validate(normalized: &str) -> ValidationResult<IsbnKind> {
    match normalized.len() {
        ISBN10_LEN => Ok(IsbnKind::Isbn10),
        ISBN13_LEN => Ok(IsbnKind::Isbn13),
        length => Err(ValidationError::InvalidFormat {
            normalized: normalized.to_string(),
            length,
        }),
    }
}

// =============================================================================
// Check Digits
// =============================================================================

/// Returns true if the normalized code carries a correct ISBN check digit.
///
/// - ISBN-10: weighted sum (10..=1) divisible by 11; `X` = 10, last position only
/// - ISBN-13: weights alternate 1/3, sum divisible by 10; no `X` allowed
///
/// Any other length returns false.
pub fn checksum_matches(normalized: &str) -> bool {
    let bytes = normalized.as_bytes();

    match bytes.len() {
        ISBN10_LEN => {
            let mut sum = 0u32;
            for (i, b) in bytes.iter().enumerate() {
                let value = match b {
                    b'0'..=b'9' => u32::from(b - b'0'),
                    b'X' if i == ISBN10_LEN - 1 => 10,
                    _ => return false,
                };
                sum += value * (ISBN10_LEN - i) as u32;
            }
            sum % 11 == 0
        }
        ISBN13_LEN => {
            let mut sum = 0u32;
            for (i, b) in bytes.iter().enumerate() {
                if !b.is_ascii_digit() {
                    return false;
                }
                let weight = if i % 2 == 0 { 1 } else { 3 };
                sum += u32::from(b - b'0') * weight;
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

// =============================================================================
// Candidate Code
// =============================================================================

/// A piece of raw text from either channel, with its normalized form.
///
/// Candidates are ephemeral: one per decode event or vision response. Only a
/// valid one is turned into a [`ScanResult`](crate::types::ScanResult).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateCode {
    /// Exactly what the producer emitted.
    pub raw: String,

    /// Output of [`normalize`] on `raw`.
    pub normalized: String,

    /// True iff `normalized` is 10 or 13 characters long.
    pub valid: bool,
}

impl CandidateCode {
    /// Normalizes `raw` and records whether the result is a valid length.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        let valid = validate(&normalized).is_ok();

        CandidateCode {
            raw,
            normalized,
            valid,
        }
    }

    /// Re-runs validation to get the kind or the rejection reason.
    pub fn validate(&self) -> ValidationResult<IsbnKind> {
        validate(&self.normalized)
    }

    /// Returns true if the check digit matches (informational).
    pub fn checksum_matches(&self) -> bool {
        checksum_matches(&self.normalized)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("978-0-13-468599-1"), "9780134685991");
        assert_eq!(normalize("978 0 13 468599 1"), "9780134685991");
        assert_eq!(normalize("  0-8044-2957-x "), "080442957X");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_vision_response() {
        assert_eq!(normalize("ISBN: 0-13-468599-1 (paperback)"), "0134685991");
    }

    #[test]
    fn test_normalize_ignores_non_ascii_digits() {
        // Full-width digits are not ISBN characters
        assert_eq!(normalize("９７８"), "");
    }

    #[test]
    fn test_validate_lengths() {
        assert_eq!(validate("0134685991").unwrap(), IsbnKind::Isbn10);
        assert_eq!(validate("9780134685991").unwrap(), IsbnKind::Isbn13);

        assert!(validate("").is_err());
        assert!(validate("12").is_err());
        assert!(validate("013468599").is_err());
        assert!(validate("97801346859912").is_err());
    }

    #[test]
    fn test_validate_reports_length() {
        let err = validate("12").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFormat {
                normalized: "12".to_string(),
                length: 2,
            }
        );
    }

    #[test]
    fn test_checksum_isbn13() {
        assert!(checksum_matches("9780134685991"));
        assert!(!checksum_matches("9780134685992"));
        assert!(!checksum_matches("978013468599X"));
    }

    #[test]
    fn test_checksum_isbn10() {
        assert!(checksum_matches("0134685997"));
        assert!(checksum_matches("080442957X"));
        assert!(!checksum_matches("0134685991"));
        // X only allowed as the check character
        assert!(!checksum_matches("X134685997"));
    }

    #[test]
    fn test_checksum_other_lengths() {
        assert!(!checksum_matches(""));
        assert!(!checksum_matches("12"));
    }

    #[test]
    fn test_candidate_from_raw() {
        let candidate = CandidateCode::from_raw("978-0-13-468599-1");
        assert_eq!(candidate.raw, "978-0-13-468599-1");
        assert_eq!(candidate.normalized, "9780134685991");
        assert!(candidate.valid);
        assert_eq!(candidate.validate().unwrap(), IsbnKind::Isbn13);

        let candidate = CandidateCode::from_raw("12");
        assert!(!candidate.valid);
        assert!(candidate.validate().is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(IsbnKind::Isbn10.to_string(), "ISBN-10");
        assert_eq!(IsbnKind::Isbn13.to_string(), "ISBN-13");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in ".*") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_isbn_like_text(raw in "[0-9xX -]{0,20}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalized_output_is_canonical(raw in ".*") {
            let normalized = normalize(&raw);
            prop_assert!(normalized.chars().all(|c| c.is_ascii_digit() || c == 'X'));
        }

        #[test]
        fn valid_iff_length_10_or_13(raw in ".*") {
            let normalized = normalize(&raw);
            let expected = normalized.len() == 10 || normalized.len() == 13;
            prop_assert_eq!(validate(&normalized).is_ok(), expected);
            prop_assert_eq!(CandidateCode::from_raw(raw).valid, expected);
        }
    }
}
