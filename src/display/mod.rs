mod console;
mod dashboard;
mod stats;

pub use console::ConsoleDisplay;
pub use dashboard::Dashboard;
pub use stats::DisplayStats;

use crate::api::SafetyStatus;
use crate::frame::DataUrl;
use std::fmt;

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    WithMask,
    WithoutMask,
    IncorrectMask,
    TotalDetections,
}

impl Counter {
    pub const ALL: [Counter; 4] = [
        Counter::WithMask,
        Counter::WithoutMask,
        Counter::IncorrectMask,
        Counter::TotalDetections,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Counter::WithMask => "With Mask",
            Counter::WithoutMask => "Without Mask",
            Counter::IncorrectMask => "Incorrect Mask",
            Counter::TotalDetections => "Total Detections",
        }
    }

    fn index(&self) -> usize {
        match self {
            Counter::WithMask => 0,
            Counter::WithoutMask => 1,
            Counter::IncorrectMask => 2,
            Counter::TotalDetections => 3,
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rendering surface for the monitor
pub trait Display: Send + Sync {
    /// Update one counter; `emphasize` marks a value that just changed
    fn set_counter(&self, counter: Counter, value: u64, emphasize: bool);

    fn set_environment_status(&self, status: SafetyStatus, safety_percentage: f64);

    fn set_last_violation(&self, last_violation: Option<&str>);

    /// Annotated frame returned by the detector
    fn show_frame(&self, frame: &DataUrl);

    /// Persistent camera error banner
    fn show_camera_error(&self, message: &str);

    fn hide_camera_error(&self);

    fn set_paused(&self, paused: bool);

    /// One-off status message
    fn notify(&self, message: &str);
}
