use crate::error::Result;
use crate::events::{EventBus, MonitorEvent};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Key bindings shown at startup
pub const KEY_HELP: &str =
    "SPACE pause/resume | r reset stats | c switch camera | e export report | m mute | q quit";

/// Command published for a key press, if the key is bound
pub fn command_for_key(key: &KeyEvent) -> Option<MonitorEvent> {
    // Raw mode swallows SIGINT, so Ctrl+C is handled here
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(MonitorEvent::ShutdownRequested {
                reason: "Ctrl+C pressed".to_string(),
            }),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(' ') => Some(MonitorEvent::TogglePause),
        KeyCode::Char('r') => Some(MonitorEvent::ResetStatistics),
        KeyCode::Char('c') => Some(MonitorEvent::SwitchCamera),
        KeyCode::Char('e') => Some(MonitorEvent::ExportReport),
        KeyCode::Char('m') => Some(MonitorEvent::ToggleAlarm),
        KeyCode::Char('q') | KeyCode::Esc => Some(MonitorEvent::ShutdownRequested {
            reason: "User requested via keyboard".to_string(),
        }),
        _ => None,
    }
}

/// Maps terminal key presses to monitor commands on the event bus
pub struct KeyboardInputHandler {
    event_bus: EventBus,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler: {}", KEY_HELP);

        let event_bus = self.event_bus.clone();
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a blocking task to handle keyboard input
        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        let Some(command) = command_for_key(&key_event) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        let quit = matches!(command, MonitorEvent::ShutdownRequested { .. });
                        info!("Key {:?}: {}", key_event.code, command.description());
                        if let Err(e) = event_bus.publish(command) {
                            warn!("Failed to publish keyboard command: {}", e);
                        }

                        if quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Ensure raw mode is disabled even if the task didn't clean up properly
        let _ = disable_raw_mode();

        Ok(())
    }
}
