use crate::camera::FacingMode;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// User commands and notable state changes in the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Pause or resume detection
    TogglePause,
    /// Reset server statistics
    ResetStatistics,
    /// Swap front and back cameras
    SwitchCamera,
    /// Write a PDF summary report
    ExportReport,
    /// Mute or unmute audio alerts
    ToggleAlarm,
    /// Stop the monitor
    ShutdownRequested { reason: String },

    /// Camera acquired
    CameraStarted { facing_mode: FacingMode },
    /// Camera acquisition failed
    CameraFailed { message: String },
    DetectionPaused,
    DetectionResumed,
    /// Environment became unsafe
    AlarmRaised { timestamp: SystemTime },
    /// Environment safe again
    AlarmCleared { timestamp: SystemTime },
    /// Discrete violation count increase
    ViolationDetected { unsafe_count: u32 },
    StatisticsReset,
    ReportExported { path: PathBuf },
    /// A component failed
    SystemError { component: String, error: String },
}

impl MonitorEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::TogglePause => "Pause toggled".to_string(),
            MonitorEvent::ResetStatistics => "Statistics reset requested".to_string(),
            MonitorEvent::SwitchCamera => "Camera switch requested".to_string(),
            MonitorEvent::ExportReport => "Report export requested".to_string(),
            MonitorEvent::ToggleAlarm => "Alarm toggle requested".to_string(),
            MonitorEvent::ShutdownRequested { reason } => {
                format!("Shutdown requested: {}", reason)
            }
            MonitorEvent::CameraStarted { facing_mode } => {
                format!("Camera started ({})", facing_mode)
            }
            MonitorEvent::CameraFailed { message } => format!("Camera failed: {}", message),
            MonitorEvent::DetectionPaused => "Detection paused".to_string(),
            MonitorEvent::DetectionResumed => "Detection resumed".to_string(),
            MonitorEvent::AlarmRaised { .. } => "Environment not safe".to_string(),
            MonitorEvent::AlarmCleared { .. } => "Environment safe".to_string(),
            MonitorEvent::ViolationDetected { unsafe_count } => {
                format!("Violation detected (unsafe count {})", unsafe_count)
            }
            MonitorEvent::StatisticsReset => "Statistics reset".to_string(),
            MonitorEvent::ReportExported { path } => {
                format!("Report exported to {}", path.display())
            }
            MonitorEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::TogglePause => "toggle_pause",
            MonitorEvent::ResetStatistics => "reset_statistics",
            MonitorEvent::SwitchCamera => "switch_camera",
            MonitorEvent::ExportReport => "export_report",
            MonitorEvent::ToggleAlarm => "toggle_alarm",
            MonitorEvent::ShutdownRequested { .. } => "shutdown_requested",
            MonitorEvent::CameraStarted { .. } => "camera_started",
            MonitorEvent::CameraFailed { .. } => "camera_failed",
            MonitorEvent::DetectionPaused => "detection_paused",
            MonitorEvent::DetectionResumed => "detection_resumed",
            MonitorEvent::AlarmRaised { .. } => "alarm_raised",
            MonitorEvent::AlarmCleared { .. } => "alarm_cleared",
            MonitorEvent::ViolationDetected { .. } => "violation_detected",
            MonitorEvent::StatisticsReset => "statistics_reset",
            MonitorEvent::ReportExported { .. } => "report_exported",
            MonitorEvent::SystemError { .. } => "system_error",
        }
    }

    /// Whether the event asks the app to do something
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            MonitorEvent::TogglePause
                | MonitorEvent::ResetStatistics
                | MonitorEvent::SwitchCamera
                | MonitorEvent::ExportReport
                | MonitorEvent::ToggleAlarm
                | MonitorEvent::ShutdownRequested { .. }
        )
    }
}

/// Event bus for component coordination using a broadcast channel
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: MonitorEvent) -> Result<usize, EventBusError> {
        match &event {
            MonitorEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            MonitorEvent::CameraFailed { message } => warn!("Camera failed: {}", message),
            MonitorEvent::ShutdownRequested { reason } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Publishing event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, tolerating a bus nobody listens to
    pub fn notify(&self, event: MonitorEvent) {
        if let Err(e) = self.publish(event) {
            debug!("Event dropped: {}", e);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    /// Only user commands
    Commands,
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    pub fn matches(&self, event: &MonitorEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Commands => event.is_command(),
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Filtered view over a bus subscription
pub struct EventReceiver {
    receiver: broadcast::Receiver<MonitorEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(bus: &EventBus, filter: EventFilter, name: impl Into<String>) -> Self {
        Self {
            receiver: bus.subscribe(),
            filter,
            name: name.into(),
        }
    }

    /// Receive the next matching event. Lagging skips the missed events.
    pub async fn recv(&mut self) -> Result<MonitorEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus
            .publish(MonitorEvent::ViolationDetected { unsafe_count: 3 })
            .unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            MonitorEvent::ViolationDetected { unsafe_count } => assert_eq!(unsafe_count, 3),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(4);
        assert!(matches!(
            event_bus.publish(MonitorEvent::TogglePause),
            Err(EventBusError::PublishFailed { .. })
        ));

        // notify swallows the same failure
        event_bus.notify(MonitorEvent::TogglePause);
    }

    #[tokio::test]
    async fn test_command_receiver_skips_notifications() {
        let event_bus = EventBus::new(10);
        let mut commands = EventReceiver::new(&event_bus, EventFilter::Commands, "test");

        event_bus.notify(MonitorEvent::DetectionPaused);
        event_bus.notify(MonitorEvent::StatisticsReset);
        event_bus.notify(MonitorEvent::SwitchCamera);

        let event = timeout(Duration::from_millis(100), commands.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, MonitorEvent::SwitchCamera);
    }

    #[tokio::test]
    async fn test_receiver_reports_closed_bus() {
        let event_bus = EventBus::new(4);
        let mut receiver = EventReceiver::new(&event_bus, EventFilter::All, "test");
        drop(event_bus);

        assert!(matches!(
            receiver.recv().await,
            Err(EventBusError::ChannelClosed)
        ));
    }

    #[test]
    fn test_event_properties() {
        let event = MonitorEvent::ShutdownRequested {
            reason: "SIGTERM".to_string(),
        };
        assert_eq!(event.event_type(), "shutdown_requested");
        assert_eq!(event.description(), "Shutdown requested: SIGTERM");
        assert!(event.is_command());

        let filter = EventFilter::EventTypes(vec!["alarm_raised"]);
        assert!(filter.matches(&MonitorEvent::AlarmRaised {
            timestamp: SystemTime::now()
        }));
        assert!(!filter.matches(&MonitorEvent::StatisticsReset));
        assert!(!MonitorEvent::CameraFailed {
            message: "busy".to_string()
        }
        .is_command());
    }
}
