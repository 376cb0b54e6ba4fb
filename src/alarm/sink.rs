use crate::error::AlertError;
use crossterm::execute;
use crossterm::style::Print;
use crossterm::tty::IsTty;
use parking_lot::Mutex;
use std::io;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Audio and speech side effects of the alarm
pub trait AlertSink: Send + Sync {
    /// Play the alert sound once
    fn play_alert(&self) -> Result<(), AlertError>;

    /// Start speaking a phrase, replacing any utterance in progress
    fn speak(&self, phrase: &str) -> Result<(), AlertError>;

    /// Abort the utterance in progress, if any
    fn cancel_speech(&self);
}

/// Sink that only logs; used for headless runs
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn play_alert(&self) -> Result<(), AlertError> {
        info!("ALERT");
        Ok(())
    }

    fn speak(&self, phrase: &str) -> Result<(), AlertError> {
        info!("Speaking: {}", phrase);
        Ok(())
    }

    fn cancel_speech(&self) {}
}

/// Terminal bell for alerts, optional external text-to-speech program
/// (e.g. `espeak`) for warnings
pub struct TerminalAlertSink {
    speech_command: Option<String>,
    utterance: Mutex<Option<Child>>,
}

impl TerminalAlertSink {
    pub fn new(speech_command: Option<String>) -> Self {
        Self {
            speech_command,
            utterance: Mutex::new(None),
        }
    }
}

impl AlertSink for TerminalAlertSink {
    fn play_alert(&self) -> Result<(), AlertError> {
        let mut stdout = io::stdout();
        if !stdout.is_tty() {
            return Err(AlertError::Blocked);
        }

        execute!(stdout, Print('\u{7}')).map_err(|e| AlertError::Playback(e.to_string()))
    }

    fn speak(&self, phrase: &str) -> Result<(), AlertError> {
        self.cancel_speech();

        let Some(program) = self.speech_command.as_deref() else {
            info!("Speaking: {}", phrase);
            return Ok(());
        };

        let child = Command::new(program)
            .arg(phrase)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AlertError::Speech(format!("{}: {}", program, e)))?;

        debug!("Started speech process {:?}", child.id());
        *self.utterance.lock() = Some(child);
        Ok(())
    }

    fn cancel_speech(&self) {
        if let Some(mut child) = self.utterance.lock().take() {
            if let Err(e) = child.start_kill() {
                // Already exited
                debug!("Speech process not killed: {}", e);
            }
        }
    }
}
