use super::{Counter, Display, DisplayStats};
use crate::api::{SafetyStatus, Statistics};
use crate::frame::DataUrl;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Default)]
struct Shown {
    counters: [u64; 4],
    status: Option<(SafetyStatus, f64)>,
    last_violation: Option<Option<String>>,
}

/// Change-tracking front of a [`Display`]. Only values that differ from what
/// is already shown are pushed; changed counters are flagged for emphasis.
pub struct Dashboard {
    display: Arc<dyn Display>,
    shown: Mutex<Shown>,
    stats: Mutex<DisplayStats>,
}

impl Dashboard {
    /// Counters start at zero, matching a freshly drawn display
    pub fn new(display: Arc<dyn Display>) -> Self {
        Self {
            display,
            shown: Mutex::new(Shown::default()),
            stats: Mutex::new(DisplayStats::default()),
        }
    }

    pub fn display(&self) -> &Arc<dyn Display> {
        &self.display
    }

    /// Push a statistics document; returns the number of display mutations
    pub fn apply(&self, stats: &Statistics) -> usize {
        let mut shown = self.shown.lock();
        let mut mutations = 0;

        let values = [
            stats.with_mask,
            stats.without_mask,
            stats.incorrect_mask,
            stats.total_detections,
        ];
        for counter in Counter::ALL {
            let value = values[counter.index()];
            if shown.counters[counter.index()] != value {
                shown.counters[counter.index()] = value;
                self.display.set_counter(counter, value, true);
                self.stats.lock().record_counter_update();
                mutations += 1;
            }
        }

        let status = (stats.current_status, stats.safety_percentage);
        if shown.status != Some(status) {
            shown.status = Some(status);
            self.display
                .set_environment_status(stats.current_status, stats.safety_percentage);
            self.stats.lock().record_status_update();
            mutations += 1;
        }

        if shown.last_violation.as_ref() != Some(&stats.last_violation) {
            shown.last_violation = Some(stats.last_violation.clone());
            self.display
                .set_last_violation(stats.last_violation.as_deref());
            mutations += 1;
        }

        trace!("Dashboard applied statistics with {} mutations", mutations);
        mutations
    }

    /// Zero counters, safe at 100%
    pub fn reset(&self) -> usize {
        self.apply(&Statistics::cleared())
    }

    /// Decode and show an annotated frame; undecodable frames are dropped
    pub fn show_frame(&self, image: &str) {
        match DataUrl::parse(image) {
            Ok(frame) => {
                self.display.show_frame(&frame);
                self.stats.lock().record_frame();
            }
            Err(e) => {
                warn!("Dropping annotated frame: {}", e);
                self.stats.lock().record_frame_error();
            }
        }
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.shown.lock().counters[counter.index()]
    }

    pub fn stats(&self) -> DisplayStats {
        self.stats.lock().clone()
    }
}
