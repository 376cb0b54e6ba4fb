use super::sink::AlertSink;
use crate::api::{AlertPayload, Statistics};
use crate::config::AlarmConfig;
use crate::error::AlertError;
use crate::events::{EventBus, MonitorEvent};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Alarm-relevant slice of a server update. `None` skips that branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmUpdate {
    pub environment_unsafe: Option<bool>,
    pub unsafe_count: Option<u32>,
}

impl From<&Statistics> for AlarmUpdate {
    fn from(stats: &Statistics) -> Self {
        Self {
            environment_unsafe: stats.environment_unsafe,
            unsafe_count: stats.unsafe_count,
        }
    }
}

impl From<&AlertPayload> for AlarmUpdate {
    fn from(payload: &AlertPayload) -> Self {
        Self {
            environment_unsafe: payload.environment_unsafe,
            unsafe_count: payload.unsafe_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlarmPhase {
    Quiet,
    Alarming,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlarmState {
    pub environment_unsafe: bool,
    pub currently_alarming: bool,
    pub previous_unsafe_count: u32,
}

/// Side effects triggered by one update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmOutcome {
    /// Phase entered by this update, if it changed
    pub transition: Option<AlarmPhase>,
    /// A discrete violation alert was raised
    pub violation: bool,
}

impl AlarmOutcome {
    /// Announce this outcome on the event bus
    pub fn publish(&self, bus: &EventBus, update: &AlarmUpdate) {
        match self.transition {
            Some(AlarmPhase::Alarming) => bus.notify(MonitorEvent::AlarmRaised {
                timestamp: SystemTime::now(),
            }),
            Some(AlarmPhase::Quiet) => bus.notify(MonitorEvent::AlarmCleared {
                timestamp: SystemTime::now(),
            }),
            None => {}
        }

        if self.violation {
            bus.notify(MonitorEvent::ViolationDetected {
                unsafe_count: update.unsafe_count.unwrap_or_default(),
            });
        }
    }
}

/// Quiet / Alarming state machine.
///
/// While alarming, a repeating audio alert and a repeating speech warning run
/// as independent tasks; both are cancelled together on the way back to
/// quiet. Must be driven from within a tokio runtime.
pub struct AlarmController {
    sink: Arc<dyn AlertSink>,
    warning_phrase: Arc<str>,
    audio_interval: Duration,
    speech_interval: Duration,
    enabled: Arc<AtomicBool>,
    state: AlarmState,
    timers: Option<CancellationToken>,
}

impl AlarmController {
    pub fn new(config: &AlarmConfig, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            sink,
            warning_phrase: Arc::from(config.warning_phrase.as_str()),
            audio_interval: config.audio_interval(),
            speech_interval: config.speech_interval(),
            enabled: Arc::new(AtomicBool::new(config.enabled)),
            state: AlarmState::default(),
            timers: None,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn phase(&self) -> AlarmPhase {
        if self.state.environment_unsafe {
            AlarmPhase::Alarming
        } else {
            AlarmPhase::Quiet
        }
    }

    /// Whether the repeating audio and speech timers are live
    pub fn timers_armed(&self) -> bool {
        self.timers
            .as_ref()
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Mute or unmute audio alerts. Speech warnings are unaffected.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        info!("Audio alerts {}", if enabled { "enabled" } else { "muted" });
    }

    /// Evaluate one server update
    pub fn update(&mut self, update: AlarmUpdate) -> AlarmOutcome {
        let mut outcome = AlarmOutcome::default();

        if let Some(unsafe_now) = update.environment_unsafe {
            if unsafe_now && !self.state.environment_unsafe {
                self.enter_alarming();
                outcome.transition = Some(AlarmPhase::Alarming);
            } else if !unsafe_now && self.state.environment_unsafe {
                self.enter_quiet();
                outcome.transition = Some(AlarmPhase::Quiet);
            }
        }

        if let Some(count) = update.unsafe_count {
            let sustained = update.environment_unsafe.unwrap_or(false);
            if count > self.state.previous_unsafe_count && !sustained {
                debug!(
                    "Violation count rose {} -> {}",
                    self.state.previous_unsafe_count, count
                );
                play(self.sink.as_ref(), &self.enabled);
                outcome.violation = true;
            }
            self.state.previous_unsafe_count = count;
        }

        outcome
    }

    /// Force Quiet and forget the last violation count (pause, reset, shutdown)
    pub fn quiesce(&mut self) {
        self.cancel_timers();
        self.sink.cancel_speech();
        self.state = AlarmState::default();
        debug!("Alarm quiesced");
    }

    fn enter_alarming(&mut self) {
        warn!("Environment not safe, alarm raised");
        self.state.environment_unsafe = true;
        self.state.currently_alarming = true;

        speak(self.sink.as_ref(), &self.warning_phrase);

        self.cancel_timers();
        let token = CancellationToken::new();
        self.spawn_audio_timer(token.clone());
        self.spawn_speech_timer(token.clone());
        self.timers = Some(token);
    }

    fn enter_quiet(&mut self) {
        info!("Environment safe again, alarm cleared");
        self.state.environment_unsafe = false;
        self.state.currently_alarming = false;

        self.cancel_timers();
        self.sink.cancel_speech();
    }

    fn cancel_timers(&mut self) {
        if let Some(token) = self.timers.take() {
            token.cancel();
        }
    }

    fn spawn_audio_timer(&self, token: CancellationToken) {
        let sink = Arc::clone(&self.sink);
        let enabled = Arc::clone(&self.enabled);
        let period = self.audio_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => play(sink.as_ref(), &enabled),
                }
            }
        });
    }

    fn spawn_speech_timer(&self, token: CancellationToken) {
        let sink = Arc::clone(&self.sink);
        let phrase = Arc::clone(&self.warning_phrase);
        let period = self.speech_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => speak(sink.as_ref(), &phrase),
                }
            }
        });
    }
}

impl Drop for AlarmController {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn play(sink: &dyn AlertSink, enabled: &AtomicBool) {
    if !enabled.load(Ordering::Relaxed) {
        return;
    }

    match sink.play_alert() {
        Ok(()) => {}
        Err(AlertError::Blocked) => debug!("Audio alert blocked"),
        Err(e) => error!("Error playing alarm: {}", e),
    }
}

fn speak(sink: &dyn AlertSink, phrase: &str) {
    if let Err(e) = sink.speak(phrase) {
        error!("Error with speech synthesis: {}", e);
    }
}
