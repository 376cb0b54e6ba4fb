use super::backend::{CaptureBackend, CaptureDevice};
use super::types::{CaptureConstraints, FacingMode, TrackSettings};
use crate::error::CameraError;
use crate::frame::RawFrame;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Synthetic capture backend for running without camera hardware.
///
/// Generates a moving colour pattern and models the constraints of a real
/// platform: one device open at a time, optional warm-up before frames flow,
/// and injectable acquisition failures.
pub struct MockCaptureBackend {
    supported: bool,
    available: Vec<FacingMode>,
    reports_facing_mode: bool,
    warmup_grabs: u64,
    failure: Mutex<Option<CameraError>>,
    open_devices: Arc<AtomicUsize>,
    opens: AtomicUsize,
}

impl MockCaptureBackend {
    pub fn new() -> Self {
        Self {
            supported: true,
            available: vec![FacingMode::User, FacingMode::Environment],
            reports_facing_mode: true,
            warmup_grabs: 0,
            failure: Mutex::new(None),
            open_devices: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
        }
    }

    /// Pretend the capture API does not exist
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Restrict which cameras are present
    pub fn with_cameras(mut self, available: Vec<FacingMode>) -> Self {
        self.available = available;
        self
    }

    /// Devices report no facing mode in their settings
    pub fn without_facing_mode(mut self) -> Self {
        self.reports_facing_mode = false;
        self
    }

    /// Number of grabs that return nothing after opening
    pub fn with_warmup(mut self, grabs: u64) -> Self {
        self.warmup_grabs = grabs;
        self
    }

    /// Make every subsequent open fail with the given error
    pub fn fail_with(&self, error: CameraError) {
        *self.failure.lock() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Devices currently held open
    pub fn open_devices(&self) -> usize {
        self.open_devices.load(Ordering::SeqCst)
    }

    /// Successful opens since creation
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for MockCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for MockCaptureBackend {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let device = format!("mock:{}", constraints.facing_mode);

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        if !self.available.contains(&constraints.facing_mode) {
            return Err(CameraError::DeviceNotFound { device });
        }

        if self.open_devices.load(Ordering::SeqCst) > 0 {
            return Err(CameraError::DeviceBusy { device });
        }

        self.open_devices.fetch_add(1, Ordering::SeqCst);
        self.opens.fetch_add(1, Ordering::SeqCst);
        debug!("Opened {} at {}x{}", device, constraints.ideal_width, constraints.ideal_height);

        Ok(Box::new(MockCaptureDevice {
            settings: TrackSettings {
                facing_mode: self
                    .reports_facing_mode
                    .then_some(constraints.facing_mode),
                width: constraints.ideal_width,
                height: constraints.ideal_height,
                label: device,
            },
            warmup_grabs: self.warmup_grabs,
            grabs: AtomicU64::new(0),
            frame_counter: AtomicU64::new(0),
            released: AtomicBool::new(false),
            open_devices: Arc::clone(&self.open_devices),
        }))
    }
}

struct MockCaptureDevice {
    settings: TrackSettings,
    warmup_grabs: u64,
    grabs: AtomicU64,
    frame_counter: AtomicU64,
    released: AtomicBool,
    open_devices: Arc<AtomicUsize>,
}

impl CaptureDevice for MockCaptureDevice {
    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn grab(&mut self) -> Option<RawFrame> {
        if self.released.load(Ordering::SeqCst) {
            return None;
        }

        let grab = self.grabs.fetch_add(1, Ordering::Relaxed);
        if grab < self.warmup_grabs {
            trace!("Mock device warming up ({}/{})", grab + 1, self.warmup_grabs);
            return None;
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let width = self.settings.width;
        let height = self.settings.height;
        let mut data = vec![0u8; (width * height * 3) as usize];

        // Fill with a simple pattern based on frame ID
        let color = ((frame_id % 256) as u8, 128u8, (255 - frame_id % 256) as u8);
        for chunk in data.chunks_mut(3) {
            chunk[0] = color.0;
            chunk[1] = color.1;
            chunk[2] = color.2;
        }

        trace!("Generated mock frame {} ({}x{})", frame_id, width, height);
        Some(RawFrame::new(frame_id, data, width, height))
    }

    fn stop(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.open_devices.fetch_sub(1, Ordering::SeqCst);
            debug!("Released {}", self.settings.label);
        }
    }
}

impl Drop for MockCaptureDevice {
    fn drop(&mut self) {
        self.stop();
    }
}
