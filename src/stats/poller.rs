use crate::alarm::{AlarmController, AlarmUpdate};
use crate::api::{DetectionApi, Statistics};
use crate::display::Dashboard;
use crate::events::EventBus;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Paused or shutting down; nothing reached the alarm
    Skipped,
    Updated,
    Failed,
}

/// Fetches statistics on a fixed period and feeds the dashboard and alarm
pub struct StatisticsPoller {
    api: Arc<dyn DetectionApi>,
    dashboard: Arc<Dashboard>,
    alarm: Arc<Mutex<AlarmController>>,
    bus: EventBus,
    paused: Arc<AtomicBool>,
    shutdown: CancellationToken,
    period: Duration,
    latest: Mutex<Option<Statistics>>,
    ticker: Mutex<Option<CancellationToken>>,
}

impl StatisticsPoller {
    pub fn new(
        api: Arc<dyn DetectionApi>,
        dashboard: Arc<Dashboard>,
        alarm: Arc<Mutex<AlarmController>>,
        bus: EventBus,
        paused: Arc<AtomicBool>,
        shutdown: CancellationToken,
        period: Duration,
    ) -> Self {
        Self {
            api,
            dashboard,
            alarm,
            bus,
            paused,
            shutdown,
            period,
            latest: Mutex::new(None),
            ticker: Mutex::new(None),
        }
    }

    /// Most recent statistics document received
    pub fn latest(&self) -> Option<Statistics> {
        self.latest.lock().clone()
    }

    /// Replace the cached document, e.g. after a reset
    pub fn set_latest(&self, statistics: Statistics) {
        *self.latest.lock() = Some(statistics);
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }

    fn is_halted(&self) -> bool {
        self.paused.load(Ordering::Acquire) || self.shutdown.is_cancelled()
    }

    pub async fn poll_once(&self) -> PollOutcome {
        if self.is_halted() {
            return PollOutcome::Skipped;
        }

        let statistics = match self.api.statistics().await {
            Ok(statistics) => statistics,
            Err(e) => {
                error!("Error fetching statistics: {}", e);
                return PollOutcome::Failed;
            }
        };

        // Pause and shutdown quiesce under the same lock
        let update = AlarmUpdate::from(&statistics);
        let outcome = {
            let mut alarm = self.alarm.lock();
            if self.is_halted() {
                debug!("Discarding statistics received after pause or shutdown");
                return PollOutcome::Skipped;
            }
            alarm.update(update)
        };

        self.dashboard.apply(&statistics);
        outcome.publish(&self.bus, &update);

        *self.latest.lock() = Some(statistics);
        PollOutcome::Updated
    }

    pub fn start(self: &Arc<Self>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.ticker.lock().replace(token.clone()) {
            previous.cancel();
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(this.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Statistics polling started ({:?} period)", this.period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        this.poll_once().await;
                    }
                }
            }
            debug!("Statistics poller exited");
        });
    }

    pub fn stop(&self) {
        if let Some(token) = self.ticker.lock().take() {
            token.cancel();
            info!("Statistics polling stopped");
        }
    }
}
