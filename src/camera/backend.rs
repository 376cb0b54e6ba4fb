use super::types::{CaptureConstraints, TrackSettings};
use crate::error::CameraError;
use crate::frame::RawFrame;
use async_trait::async_trait;
use reqwest::Url;

/// Source of capture devices (GStreamer/V4L2 on Linux, a mock elsewhere)
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Whether the capture API exists at all in this environment
    fn is_supported(&self) -> bool;

    /// Acquire a device matching the constraints. May suspend while the
    /// device negotiates.
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureDevice>, CameraError>;
}

/// An acquired, exclusively owned capture device
pub trait CaptureDevice: Send {
    fn settings(&self) -> TrackSettings;

    /// Latest frame, or `None` until the device has enough data
    fn grab(&mut self) -> Option<RawFrame>;

    /// Release the device. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Camera access is only granted for HTTPS servers or a server on this machine.
pub fn check_secure_origin(origin: &Url) -> Result<(), CameraError> {
    if origin.scheme() == "https" {
        return Ok(());
    }

    match origin.host_str() {
        Some("localhost") | Some("127.0.0.1") | Some("[::1]") => Ok(()),
        _ => Err(CameraError::InsecureContext {
            origin: origin.origin().ascii_serialization(),
        }),
    }
}

/// Map an OS error from opening a device node to a camera error
pub fn classify_os_error(code: Option<i32>, device: &str, details: &str) -> CameraError {
    match code {
        Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) => {
            CameraError::DeviceNotFound {
                device: device.to_string(),
            }
        }
        Some(libc::EACCES) | Some(libc::EPERM) => CameraError::PermissionDenied {
            device: device.to_string(),
        },
        Some(libc::EBUSY) => CameraError::DeviceBusy {
            device: device.to_string(),
        },
        _ => CameraError::Backend {
            details: format!("{}: {}", device, details),
        },
    }
}

/// Open the device node once to surface permission / presence / busy errors
/// before handing it to the capture pipeline.
pub fn probe_device(path: &str) -> Result<(), CameraError> {
    match std::fs::OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) => Err(classify_os_error(e.raw_os_error(), path, &e.to_string())),
    }
}
