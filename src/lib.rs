pub mod alarm;
pub mod api;
pub mod app;
pub mod camera;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod frame;
pub mod report;
pub mod stats;
pub mod submission;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use alarm::{AlarmController, AlarmPhase, AlertSink, LogAlertSink, TerminalAlertSink};
pub use api::{DetectionApi, MaskguardClient, Statistics};
pub use app::{ComponentState, KeyboardInputHandler, MonitorApp, ShutdownReason};
pub use camera::{default_backend, CameraSession, CameraSessionBuilder, CaptureBackend, FacingMode};
pub use config::MaskguardConfig;
pub use display::{ConsoleDisplay, Counter, Dashboard, Display};
pub use error::{MaskguardError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, MonitorEvent};
pub use report::ReportSummary;
pub use stats::StatisticsPoller;
pub use submission::FrameSubmissionLoop;
pub use upload::{analyze_image, UploadAnalysis};
