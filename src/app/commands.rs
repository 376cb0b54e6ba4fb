use super::{ComponentState, MonitorApp};
use crate::api::Statistics;
use crate::camera::FacingMode;
use crate::error::Result;
use crate::events::MonitorEvent;
use crate::report::ReportSummary;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

impl MonitorApp {
    /// Pause or resume detection. Returns the new paused state.
    ///
    /// Pausing stops frame submission and silences the alarm; the statistics
    /// poller keeps ticking but sends nothing until resumed.
    pub async fn toggle_pause(&self) -> bool {
        let paused = !self.paused.load(Ordering::Acquire);
        self.paused.store(paused, Ordering::Release);

        if paused {
            self.stop_submission().await;
            self.alarm.lock().quiesce();

            info!("Detection paused");
            self.event_bus.notify(MonitorEvent::DetectionPaused);
        } else {
            if self.camera.lock().await.is_active() {
                self.start_submission().await;
            }

            info!("Detection resumed");
            self.event_bus.notify(MonitorEvent::DetectionResumed);
        }

        self.dashboard.display().set_paused(paused);
        paused
    }

    /// Ask the server to reset its statistics. Local counters and the alarm
    /// are only reset once the server accepts.
    pub async fn reset_statistics(&self) -> Result<()> {
        if let Err(e) = self.api.reset_statistics().await {
            error!("Error resetting statistics: {}", e);
            return Err(e);
        }

        self.dashboard.reset();
        self.alarm.lock().quiesce();
        self.poller.set_latest(Statistics::cleared());

        info!("Statistics reset");
        self.dashboard.display().notify("Statistics reset");
        self.event_bus.notify(MonitorEvent::StatisticsReset);
        Ok(())
    }

    /// Swap to the opposite camera, resuming submission unless paused
    pub async fn switch_camera(&self) -> Result<FacingMode> {
        self.stop_submission().await;

        self.set_component_state("camera", ComponentState::Starting)
            .await;
        let result = self.camera.lock().await.switch_camera().await;

        match result {
            Ok(facing_mode) => {
                self.set_component_state("camera", ComponentState::Running)
                    .await;
                self.dashboard.display().hide_camera_error();
                self.event_bus
                    .notify(MonitorEvent::CameraStarted { facing_mode });

                if !self.is_paused() {
                    self.start_submission().await;
                }
                Ok(facing_mode)
            }
            Err(e) => {
                error!("Error switching camera: {}", e);
                self.set_component_state("camera", ComponentState::Failed)
                    .await;

                let message = e.to_string();
                self.dashboard.display().show_camera_error(&message);
                self.event_bus
                    .notify(MonitorEvent::CameraFailed { message });
                Err(e.into())
            }
        }
    }

    /// Write a summary report of the latest statistics into `dir`
    pub async fn export_report(&self, dir: &Path) -> Result<PathBuf> {
        let snapshot = self.poller.latest().unwrap_or_else(Statistics::cleared);
        let summary = ReportSummary::from_snapshot(&snapshot, Local::now());

        let path = summary.write_to(dir).await?;

        self.dashboard
            .display()
            .notify(&format!("Report saved to {}", path.display()));
        self.event_bus
            .notify(MonitorEvent::ReportExported { path: path.clone() });
        Ok(path)
    }

    /// Mute or unmute audio alerts. Returns whether audio is now enabled.
    pub fn toggle_alarm(&self) -> bool {
        let alarm = self.alarm.lock();
        let enabled = !alarm.is_enabled();
        alarm.set_enabled(enabled);
        drop(alarm);

        let message = if enabled {
            "Audio alerts enabled"
        } else {
            "Audio alerts muted"
        };
        info!("{}", message);
        self.dashboard.display().notify(message);
        enabled
    }

    /// Dispatch a command received from the event bus
    pub(super) async fn handle_command(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::TogglePause => {
                self.toggle_pause().await;
            }
            MonitorEvent::ResetStatistics => {
                if self.reset_statistics().await.is_err() {
                    self.dashboard
                        .display()
                        .notify("Statistics reset failed, see log");
                }
            }
            MonitorEvent::SwitchCamera => {
                let _ = self.switch_camera().await;
            }
            MonitorEvent::ExportReport => {
                let dir = PathBuf::from(&self.config.report.output_dir);
                if let Err(e) = self.export_report(&dir).await {
                    error!("Error generating report: {}", e);
                    self.event_bus.notify(MonitorEvent::SystemError {
                        component: "report".to_string(),
                        error: e.to_string(),
                    });
                }
            }
            MonitorEvent::ToggleAlarm => {
                self.toggle_alarm();
            }
            other => warn!("Ignoring non-command event: {}", other.description()),
        }
    }
}
