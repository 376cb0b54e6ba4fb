use super::{Counter, Display};
use crate::api::SafetyStatus;
use crate::frame::DataUrl;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// How often a frame line is printed at most
const FRAME_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Line-oriented terminal display. Raw mode may be active for keyboard
/// input, so every line ends with an explicit carriage return.
pub struct ConsoleDisplay {
    frames: Mutex<FrameReport>,
}

struct FrameReport {
    count: u64,
    last_printed: Option<Instant>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(FrameReport {
                count: 0,
                last_printed: None,
            }),
        }
    }

    fn line(&self, color: Color, bold: bool, text: &str) {
        let mut stdout = io::stdout().lock();
        let result = (|| -> io::Result<()> {
            queue!(stdout, SetForegroundColor(color))?;
            if bold {
                queue!(stdout, SetAttribute(Attribute::Bold))?;
            }
            queue!(
                stdout,
                Print(text),
                SetAttribute(Attribute::Reset),
                ResetColor,
                Print("\r\n")
            )?;
            stdout.flush()
        })();

        if let Err(e) = result {
            debug!("Console write failed: {}", e);
        }
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConsoleDisplay {
    fn set_counter(&self, counter: Counter, value: u64, emphasize: bool) {
        let color = match counter {
            Counter::WithMask => Color::Green,
            Counter::WithoutMask => Color::Red,
            Counter::IncorrectMask => Color::Yellow,
            Counter::TotalDetections => Color::Cyan,
        };
        self.line(color, emphasize, &format!("{:>18}: {}", counter.label(), value));
    }

    fn set_environment_status(&self, status: SafetyStatus, safety_percentage: f64) {
        let (color, text) = match status {
            SafetyStatus::Safe => (Color::Green, "Environment Safe"),
            SafetyStatus::Unsafe => (Color::Red, "Environment Unsafe!"),
        };
        self.line(
            color,
            !status.is_safe(),
            &format!("[{}] {} - {}% Compliance", status, text, safety_percentage),
        );
    }

    fn set_last_violation(&self, last_violation: Option<&str>) {
        match last_violation {
            Some(at) => self.line(Color::Red, false, &format!("Last detected: {}", at)),
            None => self.line(Color::DarkGrey, false, "No violations detected"),
        }
    }

    fn show_frame(&self, frame: &DataUrl) {
        let mut report = self.frames.lock();
        report.count += 1;

        let due = report
            .last_printed
            .map(|at| at.elapsed() >= FRAME_REPORT_INTERVAL)
            .unwrap_or(true);
        if due {
            report.last_printed = Some(Instant::now());
            let count = report.count;
            drop(report);
            self.line(
                Color::DarkGrey,
                false,
                &format!(
                    "Frames processed: {} (latest {} bytes, {})",
                    count,
                    frame.bytes.len(),
                    frame.mime
                ),
            );
        }
    }

    fn show_camera_error(&self, message: &str) {
        self.line(Color::Red, true, &format!("Camera error: {}", message));
    }

    fn hide_camera_error(&self) {
        self.line(Color::Green, false, "Camera ready");
    }

    fn set_paused(&self, paused: bool) {
        if paused {
            self.line(Color::Yellow, true, "Detection paused (space to resume)");
        } else {
            self.line(Color::Green, false, "Detection resumed");
        }
    }

    fn notify(&self, message: &str) {
        self.line(Color::White, false, message);
    }
}
