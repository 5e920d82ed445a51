//! In-memory fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use shelf_core::{CameraDevice, ScanNotice, ScanResult, ScanSessionState};

use crate::error::{AcquireError, AcquireResult};
use crate::platform::{
    CameraPlatform, DecodeEvent, OpenedStream, StreamConfig, StreamHandle, DECODE_CHANNEL_CAPACITY,
};
use crate::session::ScanEventSink;
use crate::vision::{VisionModel, VisionRequest};

// =============================================================================
// Stream Handles
// =============================================================================

/// Shared record of stop/clear calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct HandleLog(Arc<Mutex<Vec<&'static str>>>);

impl HandleLog {
    pub(crate) fn record(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

pub(crate) struct RecordingHandle {
    log: HandleLog,
}

impl RecordingHandle {
    pub(crate) fn new(log: HandleLog) -> Self {
        RecordingHandle { log }
    }
}

#[async_trait]
impl StreamHandle for RecordingHandle {
    async fn stop(&mut self) -> AcquireResult<()> {
        self.log.record("stop");
        Ok(())
    }

    async fn clear(&mut self) -> AcquireResult<()> {
        self.log.record("clear");
        Ok(())
    }
}

/// Handle whose `stop` always fails.
pub(crate) struct FailingHandle {
    log: HandleLog,
}

impl FailingHandle {
    pub(crate) fn new(log: HandleLog) -> Self {
        FailingHandle { log }
    }
}

#[async_trait]
impl StreamHandle for FailingHandle {
    async fn stop(&mut self) -> AcquireResult<()> {
        self.log.record("stop");
        Err(AcquireError::StreamFailed("track already ended".into()))
    }

    async fn clear(&mut self) -> AcquireResult<()> {
        self.log.record("clear");
        Ok(())
    }
}

// =============================================================================
// Camera Platform
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMode {
    Ready,
    Denied,
    /// Permission prompt that the user never answers.
    Hang,
}

/// Platform with scripted devices and decode events.
///
/// Devices get ids `dev-0`, `dev-1`, ... in the order given.
pub(crate) struct FakePlatform {
    devices: Vec<CameraDevice>,
    list_mode: ListMode,
    script: Vec<DecodeEvent>,
    close_after_script: bool,
    log: HandleLog,
    opened: Mutex<Vec<String>>,
    senders: Mutex<Vec<mpsc::Sender<DecodeEvent>>>,
}

impl FakePlatform {
    pub(crate) fn with_labels(labels: &[&str]) -> Self {
        let devices = labels
            .iter()
            .enumerate()
            .map(|(i, label)| CameraDevice::new(format!("dev-{}", i), *label))
            .collect();

        FakePlatform {
            devices,
            list_mode: ListMode::Ready,
            script: Vec::new(),
            close_after_script: false,
            log: HandleLog::default(),
            opened: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_script(mut self, script: Vec<DecodeEvent>) -> Self {
        self.script = script;
        self
    }

    /// Drop the producer once the script is delivered.
    pub(crate) fn closing_after_script(mut self) -> Self {
        self.close_after_script = true;
        self
    }

    pub(crate) fn denying(mut self) -> Self {
        self.list_mode = ListMode::Denied;
        self
    }

    pub(crate) fn hanging(mut self) -> Self {
        self.list_mode = ListMode::Hang;
        self
    }

    pub(crate) fn handle_log(&self) -> HandleLog {
        self.log.clone()
    }

    pub(crate) fn opened_devices(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl CameraPlatform for FakePlatform {
    async fn list_devices(&self) -> AcquireResult<Vec<CameraDevice>> {
        match self.list_mode {
            ListMode::Ready => Ok(self.devices.clone()),
            ListMode::Denied => Err(AcquireError::PermissionDenied),
            ListMode::Hang => std::future::pending().await,
        }
    }

    async fn open_stream(
        &self,
        device_id: &str,
        _config: &StreamConfig,
    ) -> AcquireResult<OpenedStream> {
        self.opened.lock().unwrap().push(device_id.to_string());

        let (tx, rx) = mpsc::channel(DECODE_CHANNEL_CAPACITY.max(self.script.len()));
        for event in &self.script {
            tx.try_send(event.clone())
                .map_err(|e| AcquireError::StreamFailed(e.to_string()))?;
        }
        if !self.close_after_script {
            self.senders.lock().unwrap().push(tx);
        }

        Ok(OpenedStream {
            handle: Box::new(RecordingHandle::new(self.log.clone())),
            events: rx,
        })
    }
}

// =============================================================================
// Event Sink
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SinkEvent {
    State(ScanSessionState),
    Detected(String),
    Notice(String),
    NoticeCleared,
    Warning(String),
    Error(String),
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn states(&self) -> Vec<ScanSessionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn detected(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Detected(code) => Some(code),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Notice(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn notice_clears(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == SinkEvent::NoticeCleared)
            .count()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ScanEventSink for RecordingSink {
    fn on_state(&self, _session_id: Uuid, state: ScanSessionState) {
        self.push(SinkEvent::State(state));
    }

    fn on_detected(&self, _session_id: Uuid, result: &ScanResult) {
        self.push(SinkEvent::Detected(result.code().to_string()));
    }

    fn on_notice(&self, _session_id: Uuid, notice: &ScanNotice) {
        self.push(SinkEvent::Notice(notice.message.clone()));
    }

    fn on_notice_cleared(&self, _session_id: Uuid) {
        self.push(SinkEvent::NoticeCleared);
    }

    fn on_warning(&self, _session_id: Uuid, message: &str) {
        self.push(SinkEvent::Warning(message.to_string()));
    }

    fn on_error(&self, _session_id: Uuid, error: &AcquireError) {
        self.push(SinkEvent::Error(error.to_string()));
    }
}

// =============================================================================
// Vision Model
// =============================================================================

/// Vision model that replays canned answers in order.
#[derive(Default)]
pub(crate) struct ScriptedVisionModel {
    replies: Mutex<VecDeque<AcquireResult<String>>>,
    requests: Mutex<Vec<VisionRequest>>,
}

impl ScriptedVisionModel {
    pub(crate) fn new(replies: Vec<AcquireResult<String>>) -> Self {
        ScriptedVisionModel {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<VisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for ScriptedVisionModel {
    async fn generate(&self, request: &VisionRequest) -> AcquireResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AcquireError::AiScanFailed("script exhausted".into())))
    }
}

/// Smallest byte string that sniffs as a PNG.
pub(crate) const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

/// Smallest byte string that sniffs as a JPEG.
pub(crate) const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];
