//! Keyboard-wedge camera platform.
//!
//! USB and Bluetooth barcode scanners usually present themselves as a
//! keyboard and "type" each code followed by Enter. This platform exposes
//! stdin as a single camera device:
//!
//! - a non-blank line is a decode callback
//! - a blank line is the decoder's "nothing found" noise
//! - a line starting with `!` is a decoder error (the rest is the message)
//! - EOF ends the stream
//!
//! Stdin is read on a plain OS thread. A blocking read there cannot hold up
//! runtime shutdown, so the process exits as soon as the session is done even
//! while the scanner stays connected.

use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use shelf_acquire::{
    AcquireError, AcquireResult, CameraDevice, CameraPlatform, DecodeEvent, OpenedStream,
    StreamConfig, StreamHandle, DECODE_CHANNEL_CAPACITY,
};

/// Device id the wedge reports.
pub const WEDGE_DEVICE_ID: &str = "stdin";

/// Reported for blank lines; classified as noise by the session.
const NOTHING_FOUND: &str = "No barcode or QR code detected.";

/// Stdin-backed [`CameraPlatform`].
pub struct WedgePlatform {
    device: CameraDevice,
}

impl WedgePlatform {
    pub fn stdin() -> Self {
        WedgePlatform {
            device: CameraDevice::new(WEDGE_DEVICE_ID, "Keyboard wedge scanner (back)"),
        }
    }
}

#[async_trait]
impl CameraPlatform for WedgePlatform {
    async fn list_devices(&self) -> AcquireResult<Vec<CameraDevice>> {
        Ok(vec![self.device.clone()])
    }

    async fn open_stream(
        &self,
        device_id: &str,
        config: &StreamConfig,
    ) -> AcquireResult<OpenedStream> {
        if device_id != self.device.id {
            return Err(AcquireError::StreamFailed(format!(
                "unknown device '{}'",
                device_id
            )));
        }
        debug!(?config, "Opening keyboard wedge on stdin");

        let (tx, rx) = mpsc::channel(DECODE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let reader_cancel = cancel.clone();
        std::thread::Builder::new()
            .name("wedge-stdin".into())
            .spawn(move || pump_lines(std::io::stdin().lock(), tx, reader_cancel))
            .map_err(|e| AcquireError::StreamFailed(format!("failed to start reader: {}", e)))?;

        Ok(OpenedStream {
            handle: Box::new(WedgeHandle { cancel }),
            events: rx,
        })
    }
}

/// Tells the reader thread to stop forwarding.
///
/// The thread is never joined: it may be parked in a read that only the next
/// line or EOF can end. It exits on its own after that.
struct WedgeHandle {
    cancel: CancellationToken,
}

#[async_trait]
impl StreamHandle for WedgeHandle {
    async fn stop(&mut self) -> AcquireResult<()> {
        self.cancel.cancel();
        Ok(())
    }

    async fn clear(&mut self) -> AcquireResult<()> {
        // Nothing is drawn
        Ok(())
    }
}

/// Maps one input line to a decode event.
fn line_event(line: &str) -> DecodeEvent {
    let line = line.trim();
    if line.is_empty() {
        DecodeEvent::Error(NOTHING_FOUND.to_string())
    } else if let Some(message) = line.strip_prefix('!') {
        DecodeEvent::Error(message.trim().to_string())
    } else {
        DecodeEvent::Decoded(line.to_string())
    }
}

/// Forwards lines until EOF, cancellation, or the session hangs up.
///
/// Blocking; run it off the runtime.
fn pump_lines<R: BufRead>(reader: R, tx: mpsc::Sender<DecodeEvent>, cancel: CancellationToken) {
    for line in reader.lines() {
        if cancel.is_cancelled() {
            debug!("Keyboard wedge stopped");
            return;
        }

        match line {
            Ok(line) => {
                if tx.blocking_send(line_event(&line)).is_err() {
                    debug!("Scan session gone, keyboard wedge stopping");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read keyboard wedge input");
                return;
            }
        }
    }

    debug!("Keyboard wedge input closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_event() {
        assert_eq!(
            line_event("9780134685991\r"),
            DecodeEvent::Decoded("9780134685991".into())
        );
        assert_eq!(line_event("   "), DecodeEvent::Error(NOTHING_FOUND.into()));
        assert_eq!(
            line_event("! lens dirty"),
            DecodeEvent::Error("lens dirty".into())
        );
    }

    #[test]
    fn test_pump_forwards_until_eof() {
        let input = Cursor::new("12\n\n978-0-13-468599-1\n");
        let (tx, mut rx) = mpsc::channel(8);

        pump_lines(input, tx, CancellationToken::new());

        assert_eq!(rx.try_recv().unwrap(), DecodeEvent::Decoded("12".into()));
        assert_eq!(rx.try_recv().unwrap(), DecodeEvent::Error(NOTHING_FOUND.into()));
        assert_eq!(
            rx.try_recv().unwrap(),
            DecodeEvent::Decoded("978-0-13-468599-1".into())
        );
        // Sender dropped at EOF
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_pump_stops_when_cancelled() {
        let input = Cursor::new("9780134685991\n");
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        pump_lines(input, tx, cancel);

        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_pump_stops_when_session_hangs_up() {
        let input = Cursor::new("12\n9780134685991\n");
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        // Returns instead of blocking on a closed channel
        pump_lines(input, tx, CancellationToken::new());
    }

    #[tokio::test]
    async fn test_stop_returns_without_input() {
        let mut handle = WedgeHandle {
            cancel: CancellationToken::new(),
        };

        tokio::time::timeout(std::time::Duration::from_secs(1), handle.stop())
            .await
            .expect("stop must not wait for stdin")
            .unwrap();
        assert!(handle.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_wedge_lists_one_device() {
        let platform = WedgePlatform::stdin();
        let devices = platform.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, WEDGE_DEVICE_ID);

        let err = platform
            .open_stream("other", &StreamConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::StreamFailed(_)));
    }
}
