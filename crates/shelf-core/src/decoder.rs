//! # Decoder Signal Classification
//!
//! Barcode decoders report "no code in this frame" through their error
//! callback, many times per second. Those are not failures and must never
//! reach the user or the logs as errors. Everything else the decoder reports
//! is a non-fatal warning.
//!
//! ```text
//! "QR code parse error, error = NotFoundException: No MultiFormat Readers
//!  were able to detect the code."                       → Noise (dropped)
//! "No barcode or QR code detected."                     → Noise (dropped)
//! ""                                                    → Noise (dropped)
//! "Video stream stalled"                                → Warning
//! ```

/// What a decoder error-callback message means for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderSignal {
    /// "Nothing detected yet". Suppressed entirely.
    Noise,
    /// Anything else. Surfaced without closing the session.
    Warning(String),
}

/// Lowercased fragments that mark a "nothing found in this frame" message.
const NOISE_MARKERS: [&str; 4] = [
    "notfoundexception",
    "no multiformat readers",
    "no barcode or qr code detected",
    "no code detected",
];

/// Classifies a decoder error-callback message.
pub fn classify_decoder_message(message: &str) -> DecoderSignal {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return DecoderSignal::Noise;
    }

    let lowered = trimmed.to_lowercase();
    if NOISE_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        DecoderSignal::Noise
    } else {
        DecoderSignal::Warning(trimmed.to_string())
    }
}
