mod backend;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod gst;
mod mock;
mod session;
mod types;

pub use backend::{check_secure_origin, classify_os_error, probe_device, CaptureBackend, CaptureDevice};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gst::GstCaptureBackend;
pub use mock::MockCaptureBackend;
pub use session::{CameraSession, CameraSessionBuilder};
pub use types::{CameraState, CaptureConstraints, FacingMode, TrackSettings};

use std::sync::Arc;

/// Capture backend for this build: GStreamer on Linux with the `camera`
/// feature, the synthetic backend otherwise.
pub fn default_backend() -> Arc<dyn CaptureBackend> {
    #[cfg(all(feature = "camera", target_os = "linux"))]
    {
        Arc::new(GstCaptureBackend::new())
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    {
        tracing::warn!("Camera feature is disabled, using mock capture backend");
        Arc::new(MockCaptureBackend::new())
    }
}
