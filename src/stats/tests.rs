use super::*;
use crate::alarm::AlarmController;
use crate::api::{SafetyStatus, Statistics};
use crate::config::AlarmConfig;
use crate::display::{Counter, Dashboard};
use crate::events::{EventBus, MonitorEvent};
use crate::test_support::{RecordingDisplay, RecordingSink, ScriptedApi};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

struct Fixture {
    poller: Arc<StatisticsPoller>,
    api: Arc<ScriptedApi>,
    display: Arc<RecordingDisplay>,
    sink: Arc<RecordingSink>,
    alarm: Arc<Mutex<AlarmController>>,
    paused: Arc<AtomicBool>,
    shutdown: CancellationToken,
    bus: EventBus,
}

fn fixture() -> Fixture {
    let api = Arc::new(ScriptedApi::default());
    let display = Arc::new(RecordingDisplay::default());
    let sink = Arc::new(RecordingSink::default());
    let alarm = Arc::new(Mutex::new(AlarmController::new(
        &AlarmConfig::default(),
        sink.clone(),
    )));
    let paused = Arc::new(AtomicBool::new(false));
    let shutdown = CancellationToken::new();
    let bus = EventBus::new(16);

    let poller = Arc::new(StatisticsPoller::new(
        api.clone(),
        Arc::new(Dashboard::new(display.clone())),
        Arc::clone(&alarm),
        bus.clone(),
        Arc::clone(&paused),
        shutdown.clone(),
        Duration::from_secs(1),
    ));

    Fixture {
        poller,
        api,
        display,
        sink,
        alarm,
        paused,
        shutdown,
        bus,
    }
}

#[tokio::test(start_paused = true)]
async fn test_polls_every_second() {
    let f = fixture();
    f.poller.start();
    assert!(f.poller.is_running());

    sleep(Duration::from_millis(3_500)).await;
    // Ticks at 0, 1, 2 and 3 s
    assert_eq!(f.api.count("statistics"), 4);

    f.poller.stop();
    assert!(!f.poller.is_running());
    sleep(Duration::from_secs(5)).await;
    assert_eq!(f.api.count("statistics"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_paused_sends_no_request() {
    let f = fixture();
    f.paused.store(true, Ordering::SeqCst);

    assert_eq!(f.poller.poll_once().await, PollOutcome::Skipped);

    f.poller.start();
    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(f.api.count("statistics"), 0);

    f.paused.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(f.api.count("statistics"), 1);
    f.poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_polling() {
    let f = fixture();
    f.api.set_statistics(None);

    assert_eq!(f.poller.poll_once().await, PollOutcome::Failed);
    assert!(f.poller.latest().is_none());

    f.poller.start();
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(f.api.count("statistics"), 4);

    f.api.set_statistics(Some(Statistics::cleared()));
    sleep(Duration::from_secs(1)).await;
    assert!(f.poller.latest().is_some());
    f.poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_violation_count_increase_alerts_once() {
    let f = fixture();
    let mut events = f.bus.subscribe();

    f.api.set_statistics(Some(Statistics {
        unsafe_count: Some(2),
        environment_unsafe: Some(false),
        ..Statistics::cleared()
    }));
    f.poller.poll_once().await;
    let after_first = f.sink.plays();

    f.api.set_statistics(Some(Statistics {
        current_status: SafetyStatus::Unsafe,
        unsafe_count: Some(3),
        environment_unsafe: Some(false),
        ..Statistics::cleared()
    }));
    assert_eq!(f.poller.poll_once().await, PollOutcome::Updated);

    assert_eq!(f.sink.plays() - after_first, 1);
    assert_eq!(f.alarm.lock().state().previous_unsafe_count, 3);

    // Same count again: no further alert
    f.poller.poll_once().await;
    assert_eq!(f.sink.plays() - after_first, 1);

    let mut violations = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let MonitorEvent::ViolationDetected { unsafe_count } = event {
            violations.push(unsafe_count);
        }
    }
    assert_eq!(violations, vec![2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_environment_unsafe_raises_alarm_and_updates_dashboard() {
    let f = fixture();

    f.api.set_statistics(Some(Statistics {
        with_mask: 1,
        without_mask: 3,
        total_detections: 4,
        current_status: SafetyStatus::Unsafe,
        safety_percentage: 25.0,
        environment_unsafe: Some(true),
        unsafe_count: Some(3),
        ..Statistics::cleared()
    }));
    f.poller.poll_once().await;

    assert!(f.alarm.lock().timers_armed());
    assert_eq!(f.sink.speeches(), 1);
    assert_eq!(f.sink.plays(), 0);
    assert!(f
        .display
        .counters()
        .contains(&(Counter::WithoutMask, 3)));
    assert_eq!(f.poller.latest().map(|s| s.total_detections), Some(4));

    f.alarm.lock().quiesce();
}

fn unsafe_environment() -> Statistics {
    Statistics {
        without_mask: 3,
        total_detections: 3,
        current_status: SafetyStatus::Unsafe,
        safety_percentage: 0.0,
        environment_unsafe: Some(true),
        unsafe_count: Some(3),
        ..Statistics::cleared()
    }
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_fetch_discards_result() {
    let f = fixture();
    let gate = f.api.gate_statistics();
    f.api.set_statistics(Some(unsafe_environment()));

    let poller = Arc::clone(&f.poller);
    let poll = tokio::spawn(async move { poller.poll_once().await });
    sleep(Duration::from_millis(10)).await;
    assert_eq!(f.api.count("statistics"), 1);

    // Same order as the pause command: flag first, then quiesce
    f.paused.store(true, Ordering::Release);
    f.alarm.lock().quiesce();
    gate.add_permits(1);

    assert_eq!(poll.await.unwrap(), PollOutcome::Skipped);
    assert!(!f.alarm.lock().state().currently_alarming);
    assert!(!f.alarm.lock().timers_armed());
    assert_eq!(f.sink.speeches(), 0);
    assert!(f.poller.latest().is_none());
    assert!(f.display.counters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_fetch_discards_result() {
    let f = fixture();
    let gate = f.api.gate_statistics();
    f.api.set_statistics(Some(unsafe_environment()));

    let poller = Arc::clone(&f.poller);
    let poll = tokio::spawn(async move { poller.poll_once().await });
    sleep(Duration::from_millis(10)).await;

    f.shutdown.cancel();
    f.alarm.lock().quiesce();
    gate.add_permits(1);

    assert_eq!(poll.await.unwrap(), PollOutcome::Skipped);
    assert!(!f.alarm.lock().timers_armed());
    assert_eq!(f.sink.speeches(), 0);
    assert_eq!(f.sink.plays(), 0);

    // No request at all once shutdown has begun
    assert_eq!(f.poller.poll_once().await, PollOutcome::Skipped);
    assert_eq!(f.api.count("statistics"), 1);
}
