use super::{ComponentState, MonitorApp};
use crate::error::Result;
use crate::events::MonitorEvent;
use tracing::{error, info, warn};

impl MonitorApp {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing MaskGuard monitor components");

        let mut states = self.component_states.lock().await;
        states.insert("camera".to_string(), ComponentState::Stopped);
        states.insert("submission".to_string(), ComponentState::Stopped);
        states.insert("statistics".to_string(), ComponentState::Stopped);

        // Only register keyboard component if enabled
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Check the server, open the camera and start the frame loop and poller.
    ///
    /// An unreachable server is only a warning. A camera failure is shown on
    /// the display and not retried; statistics polling still starts.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting MaskGuard monitor");

        match self.api.health().await {
            Ok(health) => info!(
                "Detection server is {} (camera_active: {})",
                health.status, health.camera_active
            ),
            Err(e) => warn!("Detection server health check failed: {}", e),
        }

        self.start_camera().await;

        self.set_component_state("statistics", ComponentState::Starting)
            .await;
        self.poller.start();
        self.set_component_state("statistics", ComponentState::Running)
            .await;

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.set_component_state("keyboard", ComponentState::Starting)
                    .await;

                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard input handler: {}", e);
                    e
                })?;

                self.set_component_state("keyboard", ComponentState::Running)
                    .await;
            }
        }

        let summary = self.component_summary().await;
        info!("MaskGuard monitor started ({})", summary);
        Ok(())
    }

    async fn start_camera(&self) {
        self.set_component_state("camera", ComponentState::Starting)
            .await;

        let facing_mode = self.config.camera.facing_mode;
        let result = self.camera.lock().await.start(facing_mode).await;

        match result {
            Ok(()) => {
                self.set_component_state("camera", ComponentState::Running)
                    .await;
                self.dashboard.display().hide_camera_error();
                self.event_bus
                    .notify(MonitorEvent::CameraStarted { facing_mode });

                if !self.is_paused() {
                    self.start_submission().await;
                }
            }
            Err(e) => {
                error!("Error accessing camera: {}", e);
                self.set_component_state("camera", ComponentState::Failed)
                    .await;

                let message = e.to_string();
                self.dashboard.display().show_camera_error(&message);
                self.event_bus
                    .notify(MonitorEvent::CameraFailed { message });
            }
        }
    }

    pub(super) async fn start_submission(&self) {
        self.set_component_state("submission", ComponentState::Starting)
            .await;
        self.frame_loop.start().await;
        self.set_component_state("submission", ComponentState::Running)
            .await;
    }

    pub(super) async fn stop_submission(&self) {
        self.frame_loop.stop().await;
        self.set_component_state("submission", ComponentState::Stopped)
            .await;
    }
}
