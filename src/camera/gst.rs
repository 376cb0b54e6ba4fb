use super::backend::{probe_device, CaptureBackend, CaptureDevice};
use super::types::{CaptureConstraints, FacingMode, TrackSettings};
use crate::error::CameraError;
use crate::frame::RawFrame;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// V4L2 capture through a GStreamer pipeline ending in an appsink
pub struct GstCaptureBackend {
    initialized: bool,
}

impl GstCaptureBackend {
    pub fn new() -> Self {
        let initialized = match gstreamer::init() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to initialize GStreamer: {}", e);
                false
            }
        };
        Self { initialized }
    }

    fn build_pipeline_string(device_path: &str, constraints: &CaptureConstraints) -> String {
        format!(
            "v4l2src device={} io-mode=mmap do-timestamp=true ! \
             videoconvert ! videoscale ! \
             video/x-raw,format=RGB,width={},height={} ! \
             appsink name=sink sync=false max-buffers=1 drop=true enable-last-sample=false",
            device_path, constraints.ideal_width, constraints.ideal_height
        )
    }
}

impl Default for GstCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for GstCaptureBackend {
    fn is_supported(&self) -> bool {
        self.initialized
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let device_path = format!("/dev/video{}", constraints.device_index);
        probe_device(&device_path)?;

        let pipeline_desc = Self::build_pipeline_string(&device_path, constraints);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Backend {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Backend {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| CameraError::Backend {
                details: "Pipeline has no appsink".to_string(),
            })?;

        // The node opened fine a moment ago, so a refusal to start is almost
        // always another process holding the stream.
        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            debug!("Pipeline refused to start: {}", e);
            return Err(CameraError::DeviceBusy {
                device: device_path,
            });
        }

        info!("GStreamer pipeline started for {}", device_path);

        Ok(Box::new(GstCaptureDevice {
            pipeline,
            appsink,
            facing_mode: constraints.facing_mode,
            label: device_path,
            requested: (constraints.ideal_width, constraints.ideal_height),
            frame_counter: AtomicU64::new(0),
            stopped: false,
        }))
    }
}

struct GstCaptureDevice {
    pipeline: Pipeline,
    appsink: AppSink,
    facing_mode: FacingMode,
    label: String,
    requested: (u32, u32),
    frame_counter: AtomicU64,
    stopped: bool,
}

impl CaptureDevice for GstCaptureDevice {
    fn settings(&self) -> TrackSettings {
        let (width, height) = self
            .appsink
            .static_pad("sink")
            .and_then(|pad| pad.current_caps())
            .and_then(|caps| VideoInfo::from_caps(&caps).ok())
            .map(|info| (info.width(), info.height()))
            .unwrap_or(self.requested);

        TrackSettings {
            facing_mode: Some(self.facing_mode),
            width,
            height,
            label: self.label.clone(),
        }
    }

    fn grab(&mut self) -> Option<RawFrame> {
        if self.stopped {
            return None;
        }

        let sample = self.appsink.try_pull_sample(gstreamer::ClockTime::ZERO)?;
        let caps = sample.caps()?;
        let info = VideoInfo::from_caps(caps).ok()?;
        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let stride = usize::try_from(info.stride()[0]).ok()?;
        let frame = RawFrame::from_strided(
            frame_id,
            map.as_slice(),
            stride,
            info.width(),
            info.height(),
        );
        if frame.is_none() {
            debug!(
                "Short buffer from {}: {} bytes at stride {}",
                self.label,
                map.size(),
                stride
            );
        }
        frame
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop GStreamer pipeline for {}: {}", self.label, e);
        } else {
            debug!("Released {}", self.label);
        }
    }
}

impl Drop for GstCaptureDevice {
    fn drop(&mut self) {
        self.stop();
    }
}
