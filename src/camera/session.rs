use super::backend::{check_secure_origin, CaptureBackend, CaptureDevice};
use super::types::{CameraState, CaptureConstraints, FacingMode, TrackSettings};
use crate::config::CameraConfig;
use crate::error::{CameraError, DecodeError, MaskguardError, Result};
use crate::frame::EncodedFrame;
use reqwest::Url;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Exclusive owner of the active capture device
pub struct CameraSession {
    backend: Arc<dyn CaptureBackend>,
    config: CameraConfig,
    origin: Option<Url>,
    device: Option<Box<dyn CaptureDevice>>,
    facing_mode: FacingMode,
    frame_timer: Option<CancellationToken>,
}

impl CameraSession {
    pub fn new(backend: Arc<dyn CaptureBackend>, config: CameraConfig) -> Self {
        let facing_mode = config.facing_mode;
        Self {
            backend,
            config,
            origin: None,
            device: None,
            facing_mode,
            frame_timer: None,
        }
    }

    /// Server origin the captured frames are sent to; checked on every start
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn state(&self) -> CameraState {
        if self.device.is_some() {
            CameraState::Active
        } else {
            CameraState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.device.is_some()
    }

    /// Facing mode of the active device, or the one last requested
    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    pub fn settings(&self) -> Option<TrackSettings> {
        self.device.as_ref().map(|device| device.settings())
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Acquire a device for the given facing mode
    pub async fn start(&mut self, facing_mode: FacingMode) -> std::result::Result<(), CameraError> {
        if !self.backend.is_supported() {
            return Err(CameraError::Unsupported);
        }

        if let Some(origin) = &self.origin {
            check_secure_origin(origin)?;
        }

        if self.device.is_some() {
            debug!("Releasing current device before starting a new one");
            self.stop();
        }

        let constraints = CaptureConstraints {
            facing_mode,
            ideal_width: self.config.resolution.0,
            ideal_height: self.config.resolution.1,
            device_index: self.config.device_for(facing_mode),
        };

        let device = self.backend.open(&constraints).await?;
        let settings = device.settings();

        if (settings.width, settings.height) != self.config.resolution {
            warn!(
                "Camera resolution adjusted by driver: requested {}x{}, got {}x{}",
                self.config.resolution.0, self.config.resolution.1, settings.width, settings.height
            );
        }

        info!(
            "Camera started: {} ({}x{}, facing {})",
            settings.label, settings.width, settings.height, facing_mode
        );

        self.facing_mode = facing_mode;
        self.device = Some(device);
        Ok(())
    }

    /// Encoded still of the current frame, `None` until the device has one
    pub fn capture_frame(&mut self) -> std::result::Result<Option<EncodedFrame>, DecodeError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(None);
        };

        let Some(frame) = device.grab() else {
            return Ok(None);
        };

        if !frame.validate_size() {
            warn!(
                "Dropping frame {}: {} bytes for {}x{}",
                frame.id,
                frame.data.len(),
                frame.width,
                frame.height
            );
            return Ok(None);
        }

        frame.encode_jpeg(self.config.jpeg_quality).map(Some)
    }

    /// Swap to the opposite camera. The current device is fully released
    /// before the next one is requested.
    pub async fn switch_camera(&mut self) -> std::result::Result<FacingMode, CameraError> {
        let current = self
            .settings()
            .and_then(|settings| settings.facing_mode)
            .unwrap_or(FacingMode::User);
        let next = current.opposite();

        self.stop();
        self.start(next).await?;

        info!("Switched to {} camera", next);
        Ok(next)
    }

    /// Tie a frame timer to this session; it is cancelled when the device is released
    pub fn attach_frame_timer(&mut self, token: CancellationToken) {
        if let Some(previous) = self.frame_timer.replace(token) {
            previous.cancel();
        }
    }

    /// Cancel the attached frame timer without releasing the device
    pub fn clear_frame_timer(&mut self) {
        if let Some(token) = self.frame_timer.take() {
            token.cancel();
        }
    }

    /// Release the device and clear any frame timer
    pub fn stop(&mut self) {
        self.clear_frame_timer();

        if let Some(mut device) = self.device.take() {
            device.stop();
            info!("Camera stopped");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for a camera session
pub struct CameraSessionBuilder {
    backend: Option<Arc<dyn CaptureBackend>>,
    config: Option<CameraConfig>,
    origin: Option<Url>,
}

impl CameraSessionBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            config: None,
            origin: None,
        }
    }

    pub fn backend(mut self, backend: Arc<dyn CaptureBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn build(self) -> Result<CameraSession> {
        let backend = self
            .backend
            .ok_or_else(|| MaskguardError::system("Capture backend must be specified"))?;
        let config = self.config.unwrap_or_default();

        let session = CameraSession::new(backend, config);
        Ok(match self.origin {
            Some(origin) => session.with_origin(origin),
            None => session,
        })
    }
}

impl Default for CameraSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
