use super::stats::{SubmissionStats, SubmissionStatsSnapshot};
use crate::api::{DetectionApi, ProcessFrameResponse};
use crate::camera::CameraSession;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Receives every successful detection response
pub type FrameHandler = Arc<dyn Fn(ProcessFrameResponse) + Send + Sync>;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was captured and a request is now in flight
    Submitted,
    /// A previous request is still outstanding
    SkippedBusy,
    /// The camera had no usable frame
    NoFrame,
}

/// Captures a frame on every tick and ships it to `/process_frame`.
///
/// At most one request is outstanding at any time. Ticks arriving while a
/// request is in flight are dropped, never queued. Stopping the ticker does
/// not cancel an in-flight request; its result goes to whichever handler is
/// registered when it completes.
pub struct FrameSubmissionLoop {
    camera: Arc<tokio::sync::Mutex<CameraSession>>,
    api: Arc<dyn DetectionApi>,
    period: Duration,
    busy: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<FrameHandler>>>,
    stats: Arc<SubmissionStats>,
    ticker: Mutex<Option<CancellationToken>>,
}

impl FrameSubmissionLoop {
    pub fn new(
        camera: Arc<tokio::sync::Mutex<CameraSession>>,
        api: Arc<dyn DetectionApi>,
        period: Duration,
    ) -> Self {
        Self {
            camera,
            api,
            period,
            busy: Arc::new(AtomicBool::new(false)),
            handler: Arc::new(Mutex::new(None)),
            stats: Arc::new(SubmissionStats::default()),
            ticker: Mutex::new(None),
        }
    }

    /// Register or replace the response handler
    pub fn set_handler(&self, handler: FrameHandler) {
        *self.handler.lock() = Some(handler);
    }

    pub fn clear_handler(&self) {
        *self.handler.lock() = None;
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> SubmissionStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one tick of the loop
    pub async fn tick(&self) -> TickOutcome {
        self.stats.record_tick();

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("Submission in flight, skipping tick");
            self.stats.record_skipped_busy();
            return TickOutcome::SkippedBusy;
        }

        let frame = match self.camera.lock().await.capture_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.busy.store(false, Ordering::Release);
                self.stats.record_no_frame();
                return TickOutcome::NoFrame;
            }
            Err(e) => {
                warn!("Failed to encode frame: {}", e);
                self.busy.store(false, Ordering::Release);
                self.stats.record_no_frame();
                return TickOutcome::NoFrame;
            }
        };

        let image = frame.to_data_url();
        let frame_id = frame.frame_id;
        let api = Arc::clone(&self.api);
        let busy = Arc::clone(&self.busy);
        let handler = Arc::clone(&self.handler);
        let stats = Arc::clone(&self.stats);

        self.stats.record_submitted();
        tokio::spawn(async move {
            let result = api.process_frame(image).await;

            match result {
                Ok(response) => {
                    // Resolve the handler at completion time so a replacement wins
                    let current = handler.lock().clone();
                    match current {
                        Some(handler) => {
                            stats.record_delivered();
                            busy.store(false, Ordering::Release);
                            handler(response);
                        }
                        None => {
                            debug!("Frame {} processed with no handler registered", frame_id);
                            stats.record_undelivered();
                            busy.store(false, Ordering::Release);
                        }
                    }
                }
                Err(e) => {
                    error!("Error processing frame {}: {}", frame_id, e);
                    stats.record_failed();
                    busy.store(false, Ordering::Release);
                }
            }
        });

        TickOutcome::Submitted
    }

    /// Start the ticker. The camera session holds its token, so stopping
    /// the camera also stops the ticker.
    pub async fn start(self: &Arc<Self>) {
        let token = CancellationToken::new();

        if let Some(previous) = self.ticker.lock().replace(token.clone()) {
            previous.cancel();
        }
        self.camera.lock().await.attach_frame_timer(token.clone());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(this.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Frame submission started ({:?} period)", this.period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        this.tick().await;
                    }
                }
            }
            debug!("Frame submission ticker exited");
        });
    }

    /// Cancel the ticker; an in-flight request still completes
    pub async fn stop(&self) {
        let token = self.ticker.lock().take();
        if let Some(token) = token {
            token.cancel();
            self.camera.lock().await.clear_frame_timer();
            info!("Frame submission stopped");
        }
    }
}

impl Drop for FrameSubmissionLoop {
    fn drop(&mut self) {
        if let Some(token) = self.ticker.get_mut().take() {
            token.cancel();
        }
    }
}
