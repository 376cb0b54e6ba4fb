use super::{ComponentState, MonitorApp};
use crate::error::{MaskguardError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl MonitorApp {
    /// Stop every component in reverse start order. Returns the exit code.
    pub async fn shutdown(&self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                if let Err(e) = self
                    .stop_component("keyboard", Duration::from_secs(2), keyboard_handler.stop())
                    .await
                {
                    error!("Error stopping keyboard: {}", e);
                    exit_code = 1;
                }
            }
        }

        // Late frame results must not reach the display or alarm any more
        self.frame_loop.clear_handler();
        if let Err(e) = self
            .stop_component("submission", Duration::from_secs(5), async {
                self.frame_loop.stop().await;
                Ok(())
            })
            .await
        {
            error!("Error stopping submission: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self
            .stop_component("statistics", Duration::from_secs(5), async {
                self.poller.stop();
                Ok(())
            })
            .await
        {
            error!("Error stopping statistics: {}", e);
            exit_code = 1;
        }

        self.alarm.lock().quiesce();

        if let Err(e) = self
            .stop_component("camera", Duration::from_secs(10), async {
                self.camera.lock().await.stop();
                Ok(())
            })
            .await
        {
            error!("Error stopping camera: {}", e);
            exit_code = 1;
        }

        let summary = self.component_summary().await;
        info!(
            "Graceful shutdown completed with exit code {} ({})",
            exit_code, summary
        );
        Ok(exit_code)
    }

    /// Run one component's stop routine under a timeout
    async fn stop_component<F>(&self, component: &str, limit: Duration, stop: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match timeout(limit, stop).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", component);
                Err(MaskguardError::system(format!(
                    "{} component stop timeout",
                    component
                )))
            }
        }
    }
}
