use super::*;
use crate::api::{
    DetectionApi, ProcessFrameResponse, ProcessImageResponse, ServerHealth, Statistics,
};
use crate::camera::{CameraSession, FacingMode, MockCaptureBackend};
use crate::config::CameraConfig;
use crate::error::{MaskguardError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};

/// Detection API whose frame requests block until the test releases them
struct GatedApi {
    gate: Semaphore,
    calls: AtomicUsize,
    fail: bool,
}

impl GatedApi {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionApi for GatedApi {
    async fn process_frame(&self, image: String) -> Result<ProcessFrameResponse> {
        assert!(image.starts_with("data:image/jpeg;base64,"));
        self.calls.fetch_add(1, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| MaskguardError::system("gate closed"))?;
        permit.forget();

        if self.fail {
            return Err(MaskguardError::system("detector unavailable"));
        }
        Ok(ProcessFrameResponse {
            image: "data:image/jpeg;base64,/9j/2Q==".to_string(),
            alert_data: None,
        })
    }

    async fn process_image(&self, _image: String) -> Result<ProcessImageResponse> {
        Err(MaskguardError::system("unused"))
    }

    async fn statistics(&self) -> Result<Statistics> {
        Err(MaskguardError::system("unused"))
    }

    async fn reset_statistics(&self) -> Result<()> {
        Err(MaskguardError::system("unused"))
    }

    async fn health(&self) -> Result<ServerHealth> {
        Err(MaskguardError::system("unused"))
    }
}

async fn active_camera() -> Arc<tokio::sync::Mutex<CameraSession>> {
    let config = CameraConfig {
        resolution: (32, 24),
        ..CameraConfig::default()
    };
    let mut session = CameraSession::new(Arc::new(MockCaptureBackend::new()), config);
    session.start(FacingMode::User).await.unwrap();
    Arc::new(tokio::sync::Mutex::new(session))
}

async fn wait_until(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn recording_handler() -> (FrameHandler, Arc<Mutex<Vec<ProcessFrameResponse>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let handler: FrameHandler = Arc::new(move |response| sink.lock().push(response));
    (handler, received)
}

#[tokio::test]
async fn test_overlapping_ticks_are_skipped() {
    let api = Arc::new(GatedApi::new());
    let frame_loop = FrameSubmissionLoop::new(
        active_camera().await,
        api.clone(),
        Duration::from_millis(100),
    );
    let (handler, received) = recording_handler();
    frame_loop.set_handler(handler);

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        outcomes.push(frame_loop.tick().await);
    }

    assert_eq!(outcomes[0], TickOutcome::Submitted);
    assert!(outcomes[1..].iter().all(|o| *o == TickOutcome::SkippedBusy));

    wait_until(|| api.calls() == 1).await;
    let stats = frame_loop.stats();
    assert_eq!(stats.outstanding(), 1);
    assert_eq!(stats.skipped_busy, 4);
    assert_eq!(stats.ticks, 5);

    api.release(1);
    wait_until(|| !frame_loop.is_busy()).await;
    assert_eq!(received.lock().len(), 1);
    assert_eq!(frame_loop.stats().outstanding(), 0);

    // The next tick submits again
    assert_eq!(frame_loop.tick().await, TickOutcome::Submitted);
    api.release(1);
    wait_until(|| received.lock().len() == 2).await;
}

#[tokio::test]
async fn test_tick_without_frame_is_noop() {
    let api = Arc::new(GatedApi::new());
    let camera = Arc::new(tokio::sync::Mutex::new(CameraSession::new(
        Arc::new(MockCaptureBackend::new()),
        CameraConfig::default(),
    )));
    let frame_loop = FrameSubmissionLoop::new(camera, api.clone(), Duration::from_millis(100));

    assert_eq!(frame_loop.tick().await, TickOutcome::NoFrame);
    assert!(!frame_loop.is_busy());
    assert_eq!(api.calls(), 0);
    assert_eq!(frame_loop.stats().no_frame, 1);
}

#[tokio::test]
async fn test_failures_are_swallowed() {
    let api = Arc::new(GatedApi::failing());
    let frame_loop = FrameSubmissionLoop::new(
        active_camera().await,
        api.clone(),
        Duration::from_millis(100),
    );
    let (handler, received) = recording_handler();
    frame_loop.set_handler(handler);

    api.release(2);
    assert_eq!(frame_loop.tick().await, TickOutcome::Submitted);
    wait_until(|| !frame_loop.is_busy()).await;

    assert_eq!(frame_loop.tick().await, TickOutcome::Submitted);
    wait_until(|| frame_loop.stats().failed == 2).await;

    assert!(received.lock().is_empty());
    assert!(!frame_loop.is_busy());
}

#[tokio::test]
async fn test_replaced_handler_receives_in_flight_result() {
    let api = Arc::new(GatedApi::new());
    let frame_loop = FrameSubmissionLoop::new(
        active_camera().await,
        api.clone(),
        Duration::from_millis(100),
    );
    let (first, first_received) = recording_handler();
    let (second, second_received) = recording_handler();

    frame_loop.set_handler(first);
    assert_eq!(frame_loop.tick().await, TickOutcome::Submitted);
    wait_until(|| api.calls() == 1).await;

    frame_loop.set_handler(second);
    api.release(1);
    wait_until(|| !frame_loop.is_busy()).await;

    assert!(first_received.lock().is_empty());
    assert_eq!(second_received.lock().len(), 1);
}

#[tokio::test]
async fn test_cleared_handler_drops_result() {
    let api = Arc::new(GatedApi::new());
    let frame_loop = FrameSubmissionLoop::new(
        active_camera().await,
        api.clone(),
        Duration::from_millis(100),
    );
    let (handler, received) = recording_handler();
    frame_loop.set_handler(handler);

    frame_loop.tick().await;
    frame_loop.clear_handler();
    api.release(1);
    wait_until(|| !frame_loop.is_busy()).await;

    assert!(received.lock().is_empty());
    assert_eq!(frame_loop.stats().undelivered, 1);
}

#[tokio::test]
async fn test_stop_keeps_in_flight_request() {
    let api = Arc::new(GatedApi::new());
    let frame_loop = Arc::new(FrameSubmissionLoop::new(
        active_camera().await,
        api.clone(),
        Duration::from_millis(10),
    ));
    let (handler, received) = recording_handler();
    frame_loop.set_handler(handler);

    frame_loop.start().await;
    assert!(frame_loop.is_running());
    wait_until(|| api.calls() == 1).await;

    frame_loop.stop().await;
    assert!(!frame_loop.is_running());

    api.release(1);
    wait_until(|| received.lock().len() == 1).await;

    let ticks = frame_loop.stats().ticks;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(frame_loop.stats().ticks, ticks);
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_camera_stop_cancels_ticker() {
    let api = Arc::new(GatedApi::new());
    let camera = active_camera().await;
    let frame_loop = Arc::new(FrameSubmissionLoop::new(
        Arc::clone(&camera),
        api.clone(),
        Duration::from_millis(10),
    ));

    frame_loop.start().await;
    assert!(frame_loop.is_running());

    camera.lock().await.stop();
    assert!(!frame_loop.is_running());
    api.release(1);
}
