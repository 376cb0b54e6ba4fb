use super::keyboard_input::KeyboardInputHandler;
use super::types::{ComponentState, ShutdownReason};
use crate::alarm::{AlarmController, AlarmUpdate, AlertSink};
use crate::api::{DetectionApi, MaskguardClient, ProcessFrameResponse, Statistics};
use crate::camera::{CameraSession, CaptureBackend};
use crate::config::MaskguardConfig;
use crate::display::{Dashboard, Display};
use crate::error::{Result, TransportError};
use crate::events::EventBus;
use crate::stats::StatisticsPoller;
use crate::submission::{FrameHandler, FrameSubmissionLoop};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// Wires the camera, submission loop, poller, alarm and display together
pub struct MonitorApp {
    pub(super) config: MaskguardConfig,
    pub(super) event_bus: EventBus,
    pub(super) api: Arc<dyn DetectionApi>,

    // Components
    pub(super) camera: Arc<Mutex<CameraSession>>,
    pub(super) frame_loop: Arc<FrameSubmissionLoop>,
    pub(super) poller: Arc<StatisticsPoller>,
    pub(super) dashboard: Arc<Dashboard>,
    pub(super) alarm: Arc<parking_lot::Mutex<AlarmController>>,
    pub(super) paused: Arc<AtomicBool>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl MonitorApp {
    /// Create a monitor talking to the configured detection server
    pub fn new(
        config: MaskguardConfig,
        backend: Arc<dyn CaptureBackend>,
        display: Arc<dyn Display>,
        sink: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        let api: Arc<dyn DetectionApi> = Arc::new(MaskguardClient::new(&config.server)?);
        Self::with_api(config, api, backend, display, sink)
    }

    /// Create a monitor with an explicit detection API implementation
    pub fn with_api(
        config: MaskguardConfig,
        api: Arc<dyn DetectionApi>,
        backend: Arc<dyn CaptureBackend>,
        display: Arc<dyn Display>,
        sink: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        let origin = Url::parse(&config.server.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.server.base_url, e)))?;

        let event_bus = EventBus::new(config.system.event_bus_capacity);
        let paused = Arc::new(AtomicBool::new(false));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let cancellation_token = CancellationToken::new();

        let camera = Arc::new(Mutex::new(
            CameraSession::new(backend, config.camera.clone()).with_origin(origin),
        ));
        let dashboard = Arc::new(Dashboard::new(display));
        let alarm = Arc::new(parking_lot::Mutex::new(AlarmController::new(
            &config.alarm,
            sink,
        )));

        let frame_loop = Arc::new(FrameSubmissionLoop::new(
            Arc::clone(&camera),
            Arc::clone(&api),
            config.camera.frame_interval(),
        ));
        frame_loop.set_handler(frame_handler(
            Arc::clone(&dashboard),
            Arc::clone(&alarm),
            event_bus.clone(),
            Arc::clone(&paused),
            cancellation_token.clone(),
        ));

        let poller = Arc::new(StatisticsPoller::new(
            Arc::clone(&api),
            Arc::clone(&dashboard),
            Arc::clone(&alarm),
            event_bus.clone(),
            Arc::clone(&paused),
            cancellation_token.clone(),
            config.stats.poll_interval(),
        ));

        let keyboard_handler = Some(KeyboardInputHandler::new(event_bus.clone()));

        Ok(Self {
            config,
            event_bus,
            api,
            camera,
            frame_loop,
            poller,
            dashboard,
            alarm,
            paused,
            keyboard_handler,
            keyboard_enabled: false, // Enabled by the binary when stdin is a terminal
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token,
        })
    }

    /// Enable or disable the keyboard input handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    pub fn config(&self) -> &MaskguardConfig {
        &self.config
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Whether frames are currently being submitted
    pub fn is_detecting(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn is_alarming(&self) -> bool {
        self.alarm.lock().state().currently_alarming
    }

    pub fn alarm_enabled(&self) -> bool {
        self.alarm.lock().is_enabled()
    }

    /// Most recent statistics document from the poller
    pub fn latest_statistics(&self) -> Option<Statistics> {
        self.poller.latest()
    }
}

/// Shows each annotated frame and feeds its alert data to the alarm.
/// Results landing after a pause are still shown but no longer alarm;
/// results landing after shutdown began are dropped entirely.
fn frame_handler(
    dashboard: Arc<Dashboard>,
    alarm: Arc<parking_lot::Mutex<AlarmController>>,
    bus: EventBus,
    paused: Arc<AtomicBool>,
    shutdown: CancellationToken,
) -> FrameHandler {
    Arc::new(move |response: ProcessFrameResponse| {
        if shutdown.is_cancelled() {
            return;
        }
        dashboard.show_frame(&response.image);

        let Some(alert) = &response.alert_data else {
            return;
        };

        let update = AlarmUpdate::from(alert);
        let outcome = {
            let mut alarm = alarm.lock();
            if paused.load(Ordering::Acquire) || shutdown.is_cancelled() {
                return;
            }
            alarm.update(update)
        };
        outcome.publish(&bus, &update);
    })
}
