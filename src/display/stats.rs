use std::time::SystemTime;

/// Rendering counters for a display
#[derive(Debug, Clone, Default)]
pub struct DisplayStats {
    pub frames_shown: u64,
    pub frame_errors: u64,
    pub counter_updates: u64,
    pub status_updates: u64,
    pub last_frame_time: Option<SystemTime>,
}

impl DisplayStats {
    pub fn record_frame(&mut self) {
        self.frames_shown += 1;
        self.last_frame_time = Some(SystemTime::now());
    }

    pub fn record_frame_error(&mut self) {
        self.frame_errors += 1;
    }

    pub fn record_counter_update(&mut self) {
        self.counter_updates += 1;
    }

    pub fn record_status_update(&mut self) {
        self.status_updates += 1;
    }

    pub fn frame_success_rate(&self) -> f64 {
        let attempts = self.frames_shown + self.frame_errors;
        if attempts == 0 {
            0.0
        } else {
            self.frames_shown as f64 / attempts as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
