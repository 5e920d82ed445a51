//! # Vision Fallback
//!
//! Recognizes an ISBN from a still photo of a book by asking a multimodal
//! model to read the barcode digits.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  recognize(image bytes)                                                 │
//! │    │                                                                    │
//! │    ├─ sniff MIME type ──── unknown / empty / too large → InvalidImage   │
//! │    ├─ base64 encode                                                     │
//! │    ├─ model.generate(image + ISBN_INSTRUCTION)                          │
//! │    │     Network / Timeout / 429 / 5xx → backoff, retry (bounded)       │
//! │    │     retries exhausted             → ServiceUnavailable             │
//! │    ├─ empty text                       → AiScanFailed                   │
//! │    ├─ normalize whole answer                                            │
//! │    │     length 10 or 13               → ScanResult { source: Vision }  │
//! │    └─    anything else                 → NoValidCodeFound { raw }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The model's answer is trusted to be the digits alone. No substring
//! extraction is attempted: "ISBN 978... and 979..." yields 26 characters
//! and is rejected rather than guessed at.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info, warn};

use shelf_core::{CandidateCode, ScanResult, ScanSource};

use crate::config::VisionSettings;
use crate::error::{AcquireError, AcquireResult};
use crate::gemini::GeminiVisionClient;

/// Instruction sent alongside every image.
pub const ISBN_INSTRUCTION: &str = "Find the barcode on this book cover and read the ISBN printed with it. \
Respond with only the digits of the ISBN-13 (starting with 978 or 979) if present, otherwise the ISBN-10. \
Do not include dashes, spaces, labels, or any other text.";

// =============================================================================
// Request Types
// =============================================================================

/// An image ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// Sniffed MIME type.
    pub mime_type: &'static str,
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
}

impl InlineImage {
    /// Validates and encodes raw image bytes.
    pub fn from_bytes(bytes: &[u8], max_bytes: usize) -> AcquireResult<Self> {
        if bytes.is_empty() {
            return Err(AcquireError::InvalidImage("image is empty".into()));
        }
        if bytes.len() > max_bytes {
            return Err(AcquireError::InvalidImage(format!(
                "image is {} bytes, limit is {}",
                bytes.len(),
                max_bytes
            )));
        }

        let mime_type = sniff_mime_type(bytes).ok_or_else(|| {
            AcquireError::InvalidImage("unsupported image format (expected JPEG, PNG, WebP or GIF)".into())
        })?;

        Ok(InlineImage {
            mime_type,
            data: STANDARD.encode(bytes),
        })
    }
}

/// One prompt to a vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionRequest {
    pub instruction: String,
    pub image: InlineImage,
}

/// Detects the image format from its leading bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

// =============================================================================
// Model Trait
// =============================================================================

/// A multimodal model that answers a text instruction about one image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the model's text answer (possibly empty).
    async fn generate(&self, request: &VisionRequest) -> AcquireResult<String>;
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential backoff for transient model failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::from(&VisionSettings::default())
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&VisionSettings::default())
    }
}

impl From<&VisionSettings> for RetryPolicy {
    fn from(settings: &VisionSettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
        }
    }
}

// =============================================================================
// Vision Fallback
// =============================================================================

/// Still-image ISBN recognizer.
pub struct VisionFallback {
    model: Arc<dyn VisionModel>,
    retry: RetryPolicy,
    max_image_bytes: usize,
}

impl VisionFallback {
    /// Wraps any [`VisionModel`].
    pub fn new(model: Arc<dyn VisionModel>, retry: RetryPolicy, max_image_bytes: usize) -> Self {
        VisionFallback {
            model,
            retry,
            max_image_bytes,
        }
    }

    /// Builds a Gemini-backed fallback from settings.
    ///
    /// Fails with `ServiceUnavailable` when no API key is configured.
    pub fn from_settings(settings: &VisionSettings) -> AcquireResult<Self> {
        let client = GeminiVisionClient::new(settings)?;
        Ok(VisionFallback::new(
            Arc::new(client),
            RetryPolicy::from(settings),
            settings.max_image_bytes,
        ))
    }

    /// Recognizes an ISBN in `image`.
    pub async fn recognize(&self, image: &[u8]) -> AcquireResult<ScanResult> {
        let image = InlineImage::from_bytes(image, self.max_image_bytes)?;
        debug!(mime_type = image.mime_type, "Image accepted for recognition");

        let request = VisionRequest {
            instruction: ISBN_INSTRUCTION.to_string(),
            image,
        };

        let text = self.generate_with_retry(&request).await?;
        let result = extract_scan_result(&text)?;

        info!(code = %result.code(), "ISBN recognized from image");
        Ok(result)
    }

    async fn generate_with_retry(&self, request: &VisionRequest) -> AcquireResult<String> {
        let mut backoff = self.retry.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match self.model.generate(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt <= self.retry.max_retries => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.retry.max_backoff);
                    warn!(
                        attempt = attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Vision request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempts = attempt, error = %e, "Vision request failed, giving up");
                    return Err(AcquireError::ServiceUnavailable(format!(
                        "after {} attempts: {}",
                        attempt, e
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Turns a model answer into a vision-sourced result.
pub fn extract_scan_result(text: &str) -> AcquireResult<ScanResult> {
    let answer = text.trim();
    if answer.is_empty() {
        return Err(AcquireError::AiScanFailed(
            "model returned an empty answer".into(),
        ));
    }

    let candidate = CandidateCode::from_raw(answer);
    ScanResult::from_candidate(&candidate, ScanSource::Vision).map_err(|_| {
        debug!(raw = %answer, normalized = %candidate.normalized, "Model answer is not an ISBN");
        AcquireError::NoValidCodeFound {
            raw: answer.to_string(),
        }
    })
}
