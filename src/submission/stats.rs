use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the frame submission loop
#[derive(Debug, Default)]
pub struct SubmissionStats {
    ticks: AtomicU64,
    submitted: AtomicU64,
    skipped_busy: AtomicU64,
    no_frame: AtomicU64,
    failed: AtomicU64,
    delivered: AtomicU64,
    undelivered: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionStatsSnapshot {
    pub ticks: u64,
    pub submitted: u64,
    pub skipped_busy: u64,
    pub no_frame: u64,
    pub failed: u64,
    pub delivered: u64,
    /// Successful responses that arrived while no handler was registered
    pub undelivered: u64,
}

impl SubmissionStats {
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_busy(&self) {
        self.skipped_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_frame(&self) {
        self.no_frame.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undelivered(&self) {
        self.undelivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SubmissionStatsSnapshot {
        SubmissionStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            skipped_busy: self.skipped_busy.load(Ordering::Relaxed),
            no_frame: self.no_frame.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
        }
    }
}

impl SubmissionStatsSnapshot {
    /// Submissions that have not yet completed
    pub fn outstanding(&self) -> u64 {
        self.submitted
            .saturating_sub(self.failed)
            .saturating_sub(self.delivered)
            .saturating_sub(self.undelivered)
    }
}
