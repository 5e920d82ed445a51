//! Prints session events for a human watching the terminal.

use shelf_acquire::{AcquireError, ScanEventSink, ScanNotice, ScanResult, ScanSessionState};
use tracing::debug;
use uuid::Uuid;

/// Writes notices and warnings to stderr; stdout is kept for results.
pub struct ConsoleSink;

impl ScanEventSink for ConsoleSink {
    fn on_state(&self, session_id: Uuid, state: ScanSessionState) {
        debug!(%session_id, %state, "Session state");
        if state == ScanSessionState::Scanning {
            eprintln!("Scanner ready");
        }
    }

    fn on_detected(&self, _session_id: Uuid, result: &ScanResult) {
        eprintln!("Detected {} ({})", result.code(), result.source());
    }

    fn on_notice(&self, _session_id: Uuid, notice: &ScanNotice) {
        eprintln!("{}", notice.message);
    }

    fn on_notice_cleared(&self, _session_id: Uuid) {}

    fn on_warning(&self, _session_id: Uuid, message: &str) {
        eprintln!("warning: {}", message);
    }

    fn on_error(&self, _session_id: Uuid, error: &AcquireError) {
        eprintln!("error: {}", error);
    }
}
