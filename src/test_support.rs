//! Recording fakes shared by unit tests

use crate::alarm::AlertSink;
use crate::api::{
    AlertPayload, DetectionApi, ImageDetections, ProcessFrameResponse, ProcessImageResponse,
    SafetyStatus, ServerHealth, Statistics,
};
use crate::display::{Counter, Display};
use crate::error::{AlertError, MaskguardError, Result, TransportError};
use crate::frame::DataUrl;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub(crate) const TINY_JPEG_URL: &str = "data:image/jpeg;base64,/9j/2Q==";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DisplayCall {
    Counter(Counter, u64, bool),
    Status(SafetyStatus, f64),
    LastViolation(Option<String>),
    Frame(usize),
    CameraError(String),
    CameraErrorCleared,
    Paused(bool),
    Notice(String),
}

#[derive(Default)]
pub(crate) struct RecordingDisplay {
    pub calls: Mutex<Vec<DisplayCall>>,
}

impl RecordingDisplay {
    pub fn take(&self) -> Vec<DisplayCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn counters(&self) -> Vec<(Counter, u64)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Counter(counter, value, _) => Some((*counter, *value)),
                _ => None,
            })
            .collect()
    }
}

impl Display for RecordingDisplay {
    fn set_counter(&self, counter: Counter, value: u64, emphasize: bool) {
        self.calls
            .lock()
            .push(DisplayCall::Counter(counter, value, emphasize));
    }

    fn set_environment_status(&self, status: SafetyStatus, safety_percentage: f64) {
        self.calls
            .lock()
            .push(DisplayCall::Status(status, safety_percentage));
    }

    fn set_last_violation(&self, last_violation: Option<&str>) {
        self.calls
            .lock()
            .push(DisplayCall::LastViolation(last_violation.map(str::to_string)));
    }

    fn show_frame(&self, frame: &DataUrl) {
        self.calls.lock().push(DisplayCall::Frame(frame.bytes.len()));
    }

    fn show_camera_error(&self, message: &str) {
        self.calls
            .lock()
            .push(DisplayCall::CameraError(message.to_string()));
    }

    fn hide_camera_error(&self) {
        self.calls.lock().push(DisplayCall::CameraErrorCleared);
    }

    fn set_paused(&self, paused: bool) {
        self.calls.lock().push(DisplayCall::Paused(paused));
    }

    fn notify(&self, message: &str) {
        self.calls.lock().push(DisplayCall::Notice(message.to_string()));
    }
}

/// Alert sink that counts every side effect
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub plays: AtomicUsize,
    pub spoken: Mutex<Vec<String>>,
    pub cancels: AtomicUsize,
    pub blocked: bool,
}

impl RecordingSink {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn speeches(&self) -> usize {
        self.spoken.lock().len()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl AlertSink for RecordingSink {
    fn play_alert(&self) -> std::result::Result<(), AlertError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.blocked {
            Err(AlertError::Blocked)
        } else {
            Ok(())
        }
    }

    fn speak(&self, phrase: &str) -> std::result::Result<(), AlertError> {
        self.spoken.lock().push(phrase.to_string());
        Ok(())
    }

    fn cancel_speech(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Detection API answering from canned values
pub(crate) struct ScriptedApi {
    /// `None` makes `/statistics` fail with a 503
    pub statistics: Mutex<Option<Statistics>>,
    pub alert_data: Mutex<Option<AlertPayload>>,
    pub detections: Mutex<ImageDetections>,
    pub reset_status: AtomicU16,
    pub healthy: Mutex<bool>,
    pub calls: Mutex<Vec<&'static str>>,
    /// When set, `/statistics` waits for a permit before answering
    pub statistics_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self {
            statistics: Mutex::new(Some(Statistics::cleared())),
            alert_data: Mutex::new(None),
            detections: Mutex::new(ImageDetections::default()),
            reset_status: AtomicU16::new(200),
            healthy: Mutex::new(true),
            calls: Mutex::new(Vec::new()),
            statistics_gate: Mutex::new(None),
        }
    }
}

impl ScriptedApi {
    pub fn count(&self, endpoint: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == endpoint).count()
    }

    pub fn set_statistics(&self, statistics: Option<Statistics>) {
        *self.statistics.lock() = statistics;
    }

    /// Hold `/statistics` requests until the returned gate gets permits
    pub fn gate_statistics(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.statistics_gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl DetectionApi for ScriptedApi {
    async fn process_frame(&self, _image: String) -> Result<ProcessFrameResponse> {
        self.calls.lock().push("process_frame");
        Ok(ProcessFrameResponse {
            image: TINY_JPEG_URL.to_string(),
            alert_data: self.alert_data.lock().clone(),
        })
    }

    async fn process_image(&self, _image: String) -> Result<ProcessImageResponse> {
        self.calls.lock().push("process_image");
        Ok(ProcessImageResponse {
            image: TINY_JPEG_URL.to_string(),
            detections: *self.detections.lock(),
        })
    }

    async fn statistics(&self) -> Result<Statistics> {
        self.calls.lock().push("statistics");
        let gate = self.statistics_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| MaskguardError::system("gate closed"))?
                .forget();
        }
        // Read after the gate so tests can change the answer mid-flight
        self.statistics.lock().clone().ok_or_else(|| {
            TransportError::Status {
                endpoint: "statistics",
                status: 503,
            }
            .into()
        })
    }

    async fn reset_statistics(&self) -> Result<()> {
        self.calls.lock().push("reset_statistics");
        let status = self.reset_status.load(Ordering::SeqCst);
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(TransportError::Status {
                endpoint: "reset_statistics",
                status,
            }
            .into())
        }
    }

    async fn health(&self) -> Result<ServerHealth> {
        self.calls.lock().push("health");
        if *self.healthy.lock() {
            Ok(ServerHealth {
                status: "healthy".to_string(),
                camera_active: true,
            })
        } else {
            Err(MaskguardError::system("health check unavailable"))
        }
    }
}
